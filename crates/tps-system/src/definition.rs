//! Declarative query definitions.
//!
//! A library lists queries by name; each query lists its fallback options in
//! priority order:
//!
//! ```yaml
//! queries:
//!   - name: CoverNearTarget
//!     options:
//!       - generation:
//!           - { spec: hidespots_from_attentionTarget_around_puppet, value: 20 }
//!         conditions:
//!           - { spec: max_distance_from_attentionTarget, value: 15 }
//!           - { spec: visible_from_attentionTarget, value: false }
//!         weights:
//!           - { spec: distance_from_puppet, value: -1.0 }
//!         parameters:
//!           optionLabel: preferred
//! ```
//!
//! A generation value is either a search distance or the name of a relative
//! value source such as `objectRadius`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tps_core::{BuildError, CriterionValue, ParamValue};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLibrary {
    pub queries: Vec<QueryDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    pub name: String,
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionDefinition {
    pub generation: Vec<CriterionDefinition>,
    pub conditions: Vec<CriterionDefinition>,
    pub weights: Vec<CriterionDefinition>,
    pub parameters: BTreeMap<String, DefinitionValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionDefinition {
    pub spec: String,
    pub value: DefinitionValue,
}

impl CriterionDefinition {
    pub fn new(spec: impl Into<String>, value: impl Into<DefinitionValue>) -> Self {
        Self {
            spec: spec.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefinitionValue {
    Bool(bool),
    Number(f32),
    Text(String),
}

impl DefinitionValue {
    pub(crate) fn criterion_value(&self, spec: &str) -> Result<CriterionValue, BuildError> {
        match self {
            Self::Bool(b) => Ok(CriterionValue::Bool(*b)),
            Self::Number(n) => Ok(CriterionValue::Float(*n)),
            Self::Text(_) => Err(BuildError::ValueType {
                spec: spec.to_owned(),
                expected: "boolean or number",
            }),
        }
    }

    pub(crate) fn weight(&self, spec: &str) -> Result<f32, BuildError> {
        match self {
            Self::Number(n) => Ok(*n),
            _ => Err(BuildError::ValueType {
                spec: spec.to_owned(),
                expected: "number",
            }),
        }
    }

    pub(crate) fn param_value(&self) -> ParamValue {
        match self {
            Self::Bool(b) => ParamValue::Bool(*b),
            Self::Number(n) => ParamValue::Float(*n),
            Self::Text(s) => ParamValue::Text(s.clone()),
        }
    }
}

impl From<bool> for DefinitionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for DefinitionValue {
    fn from(value: f32) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for DefinitionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl QueryLibrary {
    /// Load a query library from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read queries from {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse queries from {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let library: Self = serde_yaml::from_str(content).context("Invalid query library")?;
        Ok(library)
    }

    pub fn query(&self, name: &str) -> Option<&QueryDefinition> {
        self.queries.iter().find(|q| q.name == name)
    }
}
