//! Tactical Point System - query manager front-end
//!
//! This crate owns the query registry, hands out tickets, queues asynchronous
//! requests and drives the time-sliced evaluation engine from a per-frame
//! `update` call. It also loads the engine configuration and declarative query
//! definitions from YAML.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod config;
pub mod definition;
pub mod error;
pub mod manager;

pub use config::EngineConfig;
pub use definition::{
    CriterionDefinition, DefinitionValue, OptionDefinition, QueryDefinition, QueryLibrary,
};
pub use error::SystemError;
pub use manager::{QueryResults, ResultsReceiver, SyncResults, TacticalPointSystem};
