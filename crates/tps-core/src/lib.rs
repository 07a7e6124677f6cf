//! Query language of the tactical point system: words, criteria, options and queries.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod context;
pub mod criterion;
pub mod error;
pub mod math;
pub mod option;
pub mod parse;
pub mod point;
pub mod query;
pub mod rng;
pub mod token;
pub mod vocabulary;
pub mod words;

pub use context::{EntityId, QueryContext};
pub use criterion::{Criterion, CriterionValue, RelativeValueSource};
pub use error::{BuildError, ParseError, VocabularyError};
pub use math::Vec3;
pub use option::{OptionParam, OptionParams, ParamValue, QueryOption, Section};
pub use parse::{parse, unparse, ParsedSpec};
pub use point::{RegionId, TacticalPoint};
pub use query::{Query, QueryFlags, QueryId, QueryInstance, QueryTicket, MAX_OPTION_INDEX};
pub use token::{Cost, CostClass, Limit, Token, TokenCategory};
pub use vocabulary::Vocabulary;
