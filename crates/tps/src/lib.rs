//! Umbrella crate that re-exports the `tps-*` building blocks.
//!
//! `core` holds the query language, `eval` the time-sliced evaluation engine and
//! `system` the query manager that schedules evaluations from a per-frame update.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use tps_core as core;

#[cfg(feature = "eval")]
#[cfg_attr(docsrs, doc(cfg(feature = "eval")))]
pub use tps_eval as eval;

#[cfg(feature = "system")]
#[cfg_attr(docsrs, doc(cfg(feature = "system")))]
pub use tps_system as system;

/// The types most callers need to define and run queries.
#[cfg(feature = "system")]
#[cfg_attr(docsrs, doc(cfg(feature = "system")))]
pub mod prelude {
    pub use tps_core::{
        CostClass, QueryContext, QueryFlags, QueryId, QueryTicket, TacticalPoint, TokenCategory,
        Vec3,
    };
    pub use tps_eval::{
        DeferredRequest, DeferredService, DeferredValue, GenerateRequest, LanguageExtender,
        PointGenerator, PointResult,
    };
    pub use tps_system::{
        EngineConfig, QueryResults, ResultsReceiver, SystemError, TacticalPointSystem,
    };
}
