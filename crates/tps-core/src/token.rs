use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Grammatical role of a word in a criterion spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TokenCategory {
    BoolProperty,
    RealProperty,
    Test,
    Measure,
    Generator,
    GeneratorWithObject,
    Object,
    Limit,
    Glue,
    Around,
}

impl TokenCategory {
    pub const ALL: [TokenCategory; 10] = [
        TokenCategory::BoolProperty,
        TokenCategory::RealProperty,
        TokenCategory::Test,
        TokenCategory::Measure,
        TokenCategory::Generator,
        TokenCategory::GeneratorWithObject,
        TokenCategory::Object,
        TokenCategory::Limit,
        TokenCategory::Glue,
        TokenCategory::Around,
    ];

    /// Categories whose words contribute to a point's score (and therefore carry a cost).
    pub fn is_scoring(self) -> bool {
        matches!(
            self,
            TokenCategory::BoolProperty
                | TokenCategory::RealProperty
                | TokenCategory::Test
                | TokenCategory::Measure
        )
    }

    pub fn is_generator(self) -> bool {
        matches!(
            self,
            TokenCategory::Generator | TokenCategory::GeneratorWithObject
        )
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, TokenCategory::BoolProperty | TokenCategory::Test)
    }

    pub fn is_real(self) -> bool {
        matches!(self, TokenCategory::RealProperty | TokenCategory::Measure)
    }

    /// Tests, measures and generators are always followed by `glue object`.
    pub fn takes_object(self) -> bool {
        matches!(
            self,
            TokenCategory::Test
                | TokenCategory::Measure
                | TokenCategory::Generator
                | TokenCategory::GeneratorWithObject
        )
    }

    /// Categories that can grow at runtime through vocabulary extension.
    pub fn is_extensible(self) -> bool {
        self.is_scoring() || self.is_generator() || self == TokenCategory::Object
    }

    /// First index handed out to extension words; core words live below it.
    pub const fn extension_start(self) -> u16 {
        0x40
    }

    /// One past the last index this category can ever hold.
    pub const fn capacity(self) -> u16 {
        0x100
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenCategory::BoolProperty => "boolean property",
            TokenCategory::RealProperty => "real property",
            TokenCategory::Test => "test",
            TokenCategory::Measure => "measure",
            TokenCategory::Generator => "generator",
            TokenCategory::GeneratorWithObject => "generator with object",
            TokenCategory::Object => "object",
            TokenCategory::Limit => "limit",
            TokenCategory::Glue => "glue",
            TokenCategory::Around => "around",
        }
    }
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A word of the query language: a category plus an index inside that category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Token {
    category: TokenCategory,
    index: u16,
}

impl Token {
    pub const fn new(category: TokenCategory, index: u16) -> Self {
        Self { category, index }
    }

    pub fn category(self) -> TokenCategory {
        self.category
    }

    pub fn index(self) -> u16 {
        self.index
    }

    pub fn is_extension(self) -> bool {
        self.index >= self.category.extension_start()
    }
}

/// Threshold comparison carried by real-valued conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Limit {
    /// Passes when the result exceeds the value.
    Min,
    /// Passes when the result is below the value.
    Max,
    /// Passes when the result matches the value within [`Limit::EQUAL_EPSILON`].
    Equal,
}

impl Limit {
    pub const EQUAL_EPSILON: f32 = 1e-5;

    pub fn check(self, result: f32, value: f32) -> bool {
        match self {
            Limit::Min => result > value,
            Limit::Max => result < value,
            Limit::Equal => (result - value).abs() < Self::EQUAL_EPSILON,
        }
    }

    pub fn token(self) -> Token {
        match self {
            Limit::Min => crate::words::MIN,
            Limit::Max => crate::words::MAX,
            Limit::Equal => crate::words::EQUAL,
        }
    }

    pub fn from_token(token: Token) -> Option<Self> {
        match token {
            crate::words::MIN => Some(Limit::Min),
            crate::words::MAX => Some(Limit::Max),
            crate::words::EQUAL => Some(Limit::Equal),
            _ => None,
        }
    }
}

/// Coarse cost bucket supplied when a word is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CostClass {
    Cheap,
    Medium,
    Expensive,
    Deferred,
}

impl CostClass {
    pub(crate) fn slot(self) -> usize {
        match self {
            CostClass::Cheap => 0,
            CostClass::Medium => 1,
            CostClass::Expensive => 2,
            CostClass::Deferred => 3,
        }
    }

    pub(crate) fn base(self) -> i32 {
        match self {
            CostClass::Cheap => 1,
            CostClass::Medium => 256,
            CostClass::Expensive => 1024,
            CostClass::Deferred => -1024,
        }
    }
}

/// Relative cost of evaluating a word. Negative costs mark deferred evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cost(pub i32);

impl Cost {
    /// Default boundary between cheap and expensive costs.
    pub const CHEAP_THRESHOLD: i32 = 256;

    pub fn is_deferred(self) -> bool {
        self.0 < 0
    }

    pub fn is_cheap(self, threshold: i32) -> bool {
        !self.is_deferred() && self.0 < threshold
    }
}
