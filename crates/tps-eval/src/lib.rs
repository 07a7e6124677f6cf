//! Evaluation engine of the tactical point system: scoring primitives, point generation,
//! deferred requests and the time-sliced best-N selection.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod deferred;
pub mod error;
pub mod evaluation;
pub mod extender;
pub mod generate;
pub mod locks;
pub mod object;
pub mod scoring;
pub mod trace;

pub use deferred::{
    DeferredCompletion, DeferredInbox, DeferredReply, DeferredRequest, DeferredService,
    DeferredValue, FnDeferredService, RequestId,
};
pub use error::EvalFailure;
pub use evaluation::{
    EvalEnv, EvalSettings, EvalState, PointEvaluation, PointResult, PointState, QueryEvaluation,
};
pub use extender::{ExtenderId, ExtenderRegistry, GenerateRequest, LanguageExtender};
pub use generate::{GeneratorRegistry, PointGenerator};
pub use locks::ResultLocks;
pub use object::ObjectRef;
pub use scoring::Scorer;
pub use trace::{NullTraceSink, TraceEvent, TraceLog, TraceSink, VecTraceSink};
