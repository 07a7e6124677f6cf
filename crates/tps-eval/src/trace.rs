#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use tps_core::{QueryTicket, Vec3};

pub const OPTION_STARTED: &str = "option.started";
pub const GENERATED: &str = "option.generated";
pub const OPTION_EXHAUSTED: &str = "option.exhausted";
pub const POINT_REJECTED: &str = "point.rejected";
pub const POINT_NARROWED: &str = "point.narrowed";
pub const POINT_ACCEPTED: &str = "point.accepted";
pub const DEFERRED_WAIT: &str = "deferred.wait";
pub const COMPLETED: &str = "query.completed";
pub const FAILED: &str = "query.failed";

/// One step of an evaluation, recorded for debugging and tests.
///
/// `a` and `b` carry tag-specific numbers: option index and point count for option events,
/// `min`/`max` bounds for point events.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub ticket: QueryTicket,
    pub tag: Cow<'static, str>,
    pub position: Option<Vec3>,
    pub a: f32,
    pub b: f32,
}

impl TraceEvent {
    pub fn new(ticket: QueryTicket, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            ticket,
            tag: tag.into(),
            position: None,
            a: 0.0,
            b: 0.0,
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_a(mut self, a: f32) -> Self {
        self.a = a;
        self
    }

    pub fn with_b(mut self, b: f32) -> Self {
        self.b = b;
        self
    }
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Shared, inspectable sink for hosts that hand ownership of the sink to the engine.
#[derive(Debug, Default, Clone)]
pub struct TraceLog {
    events: std::rc::Rc<std::cell::RefCell<Vec<TraceEvent>>>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    pub fn with_tag(&self, tag: &str) -> Vec<TraceEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.tag == tag)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl TraceSink for TraceLog {
    fn emit(&mut self, event: TraceEvent) {
        self.events.borrow_mut().push(event);
    }
}
