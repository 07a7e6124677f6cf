//! Work the engine hands to the host and picks up on a later update.
//!
//! The engine submits [`DeferredRequest`]s to a [`DeferredService`] together with a
//! [`DeferredReply`]. The host completes the reply whenever the answer is ready (from any
//! thread); completions queue up in the [`DeferredInbox`] until the engine drains it.

use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, Sender};

use tps_core::{EntityId, QueryTicket, RegionId, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredRequest {
    /// Is the segment `from..to` free of obstacles?
    Ray { from: Vec3, to: Vec3 },
    /// Can the actor find a firing stance at `position` aiming at `target`?
    ShootingPosture {
        actor: Option<EntityId>,
        position: Vec3,
        target: Vec3,
        region: Option<RegionId>,
    },
    /// Length of the walkable path between two positions.
    PathDistance { from: Vec3, to: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredValue {
    /// Outcome of a ray or posture request.
    Clear(bool),
    Distance(f32),
    /// The host could not answer.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredCompletion {
    pub ticket: QueryTicket,
    pub request: RequestId,
    pub value: DeferredValue,
}

/// One-shot handle used to report the answer to a request.
#[derive(Debug)]
pub struct DeferredReply {
    ticket: QueryTicket,
    request: RequestId,
    sender: Sender<DeferredCompletion>,
}

impl DeferredReply {
    pub fn ticket(&self) -> QueryTicket {
        self.ticket
    }

    pub fn request_id(&self) -> RequestId {
        self.request
    }

    pub fn complete(self, value: DeferredValue) {
        let completion = DeferredCompletion {
            ticket: self.ticket,
            request: self.request,
            value,
        };
        if self.sender.send(completion).is_err() {
            tracing::debug!(request = self.request.0, "engine gone, dropping deferred result");
        }
    }
}

/// Host backend for deferred requests (raycasts, posture checks, pathfinding).
pub trait DeferredService {
    fn submit(&mut self, request: DeferredRequest, reply: DeferredReply);

    /// The engine no longer needs the answer. Completing a cancelled reply is harmless.
    fn cancel(&mut self, _request: RequestId) {}
}

/// Service that answers every request synchronously through a closure.
pub struct FnDeferredService<F> {
    answer: F,
}

impl<F> FnDeferredService<F>
where
    F: FnMut(&DeferredRequest) -> DeferredValue,
{
    pub fn new(answer: F) -> Self {
        Self { answer }
    }
}

impl<F> DeferredService for FnDeferredService<F>
where
    F: FnMut(&DeferredRequest) -> DeferredValue,
{
    fn submit(&mut self, request: DeferredRequest, reply: DeferredReply) {
        let value = (self.answer)(&request);
        reply.complete(value);
    }
}

/// Receiving end for deferred completions.
#[derive(Debug)]
pub struct DeferredInbox {
    sender: Sender<DeferredCompletion>,
    receiver: Receiver<DeferredCompletion>,
    next_request: Cell<u64>,
}

impl Default for DeferredInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferredInbox {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            next_request: Cell::new(1),
        }
    }

    /// A reply handle with a fresh request id.
    pub fn reply_for(&self, ticket: QueryTicket) -> DeferredReply {
        let id = self.next_request.get();
        self.next_request.set(id + 1);
        DeferredReply {
            ticket,
            request: RequestId(id),
            sender: self.sender.clone(),
        }
    }

    /// Everything completed since the last drain.
    pub fn drain(&self) -> Vec<DeferredCompletion> {
        self.receiver.try_iter().collect()
    }
}
