use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::context::QueryContext;
use crate::error::BuildError;
use crate::option::QueryOption;

/// Highest option index a query accepts.
pub const MAX_OPTION_INDEX: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueryId(pub u32);

/// Identifies one submitted [`QueryInstance`]. Tickets are never reused by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueryTicket(pub u64);

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct QueryFlags: u32 {
        /// Keep the returned points reserved until the ticket is unlocked.
        const LOCK_RESULTS = 1 << 0;
    }
}

/// A named, ordered list of fallback options.
///
/// Options are shared with running evaluations; editing an option that an evaluation
/// already holds copies it first, so in-flight evaluations never observe the change.
#[derive(Debug, Clone, Default)]
pub struct Query {
    name: String,
    options: Vec<Arc<QueryOption>>,
}

impl Query {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn option(&self, index: usize) -> Option<&Arc<QueryOption>> {
        self.options.get(index)
    }

    pub fn options(&self) -> &[Arc<QueryOption>] {
        &self.options
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Mutable access to an option, creating it (and any gap before it) on first use.
    pub fn option_mut(&mut self, index: usize) -> Result<&mut QueryOption, BuildError> {
        if index > MAX_OPTION_INDEX {
            tracing::warn!(query = %self.name, index, "option index out of range");
            return Err(BuildError::OptionOutOfRange {
                index,
                max: MAX_OPTION_INDEX,
            });
        }
        while self.options.len() <= index {
            self.options.push(Arc::new(QueryOption::new()));
        }
        Ok(Arc::make_mut(&mut self.options[index]))
    }

    /// A query can run once every option has at least one generator.
    pub fn is_runnable(&self) -> bool {
        !self.options.is_empty() && self.options.iter().all(|o| !o.generation().is_empty())
    }
}

/// One submission of a query.
#[derive(Debug, Clone)]
pub struct QueryInstance {
    pub ticket: QueryTicket,
    pub query: QueryId,
    pub context: QueryContext,
    pub count: usize,
    pub flags: QueryFlags,
}
