#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::parse::ParsedSpec;
use crate::token::{Limit, Token, TokenCategory};

/// Context-derived quantity a generation criterion may use instead of a literal distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RelativeValueSource {
    /// The querying actor's radius.
    ObjectRadius,
}

impl RelativeValueSource {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "objectRadius" => Some(Self::ObjectRadius),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ObjectRadius => "objectRadius",
        }
    }
}

/// Value attached to a criterion. Setting one kind replaces the other.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CriterionValue {
    Float(f32),
    Bool(bool),
}

impl CriterionValue {
    pub fn as_float(self) -> f32 {
        match self {
            Self::Float(v) => v,
            Self::Bool(true) => 1.0,
            Self::Bool(false) => 0.0,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Self::Float(v) => v != 0.0,
            Self::Bool(b) => b,
        }
    }
}

impl From<f32> for CriterionValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for CriterionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Criterion {
    query: Token,
    limit: Option<Limit>,
    object: Option<Token>,
    object_aux: Option<Token>,
    value: CriterionValue,
    relative: Option<RelativeValueSource>,
}

impl Criterion {
    pub fn new(spec: ParsedSpec, value: CriterionValue) -> Self {
        Self {
            query: spec.query,
            limit: spec.limit,
            object: spec.object,
            object_aux: spec.object_aux,
            value,
            relative: None,
        }
    }

    pub fn with_relative(mut self, source: RelativeValueSource) -> Self {
        self.relative = Some(source);
        self
    }

    pub fn query(&self) -> Token {
        self.query
    }

    pub fn category(&self) -> TokenCategory {
        self.query.category()
    }

    pub fn limit(&self) -> Option<Limit> {
        self.limit
    }

    pub fn object(&self) -> Option<Token> {
        self.object
    }

    pub fn object_aux(&self) -> Option<Token> {
        self.object_aux
    }

    pub fn value(&self) -> CriterionValue {
        self.value
    }

    pub fn value_as_float(&self) -> f32 {
        self.value.as_float()
    }

    pub fn value_as_bool(&self) -> bool {
        self.value.as_bool()
    }

    pub fn set_value(&mut self, value: CriterionValue) {
        self.value = value;
    }

    pub fn relative(&self) -> Option<RelativeValueSource> {
        self.relative
    }

    pub fn parsed(&self) -> ParsedSpec {
        ParsedSpec {
            query: self.query,
            limit: self.limit,
            object: self.object,
            object_aux: self.object_aux,
        }
    }

    /// Shape check: objects appear exactly where the category needs them and limits only on
    /// real-valued words.
    pub fn is_well_formed(&self) -> bool {
        let category = self.category();
        let object_ok = self.object.is_some() == category.takes_object();
        let aux_ok =
            self.object_aux.is_none() || category == TokenCategory::GeneratorWithObject;
        let limit_ok = self.limit.is_none() || category.is_real();
        object_ok && aux_ok && limit_ok
    }
}
