use std::collections::BTreeMap;

use tps_core::{QueryTicket, TacticalPoint};

/// Points reserved by completed queries that asked for their results to be locked.
///
/// Locked points are rejected by every other evaluation until the owning ticket is unlocked.
#[derive(Debug, Clone, Default)]
pub struct ResultLocks {
    by_ticket: BTreeMap<QueryTicket, Vec<TacticalPoint>>,
}

impl ResultLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&mut self, ticket: QueryTicket, points: Vec<TacticalPoint>) {
        if points.is_empty() {
            return;
        }
        self.by_ticket.insert(ticket, points);
    }

    pub fn unlock(&mut self, ticket: QueryTicket) -> bool {
        self.by_ticket.remove(&ticket).is_some()
    }

    pub fn is_locked(&self, ticket: QueryTicket) -> bool {
        self.by_ticket.contains_key(&ticket)
    }

    pub fn contains(&self, point: &TacticalPoint) -> bool {
        self.by_ticket
            .values()
            .any(|points| points.iter().any(|locked| locked == point))
    }

    pub fn clear(&mut self) {
        self.by_ticket.clear();
    }

    pub fn len(&self) -> usize {
        self.by_ticket.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ticket.is_empty()
    }
}
