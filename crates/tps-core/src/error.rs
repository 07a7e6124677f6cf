use crate::option::Section;
use crate::token::TokenCategory;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VocabularyError {
    #[error("word `{0}` is already registered")]
    Duplicate(String),
    #[error("no room left for new {0} words")]
    Exhausted(TokenCategory),
    #[error("{0} words cannot be added at runtime")]
    NotExtensible(TokenCategory),
    #[error("`{0}` is not a valid word")]
    InvalidName(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty criterion spec")]
    Empty,
    #[error("`{spec}` has {count} words, at most {max} are allowed")]
    TooManyWords { spec: String, count: usize, max: usize },
    #[error("`{spec}` contains an empty word")]
    EmptyWord { spec: String },
    #[error("unknown word `{word}` in `{spec}`")]
    UnknownWord { spec: String, word: String },
    #[error("`{word}` in `{spec}` cannot start a criterion")]
    UnexpectedWord { spec: String, word: String },
    #[error("`{spec}` ends early, expected {expected}")]
    MissingWord {
        spec: String,
        expected: &'static str,
    },
    #[error("expected {expected} in `{spec}`, found `{word}`")]
    Expected {
        spec: String,
        word: String,
        expected: &'static str,
    },
    #[error("`{spec}` has trailing words starting at `{word}`")]
    TrailingWords { spec: String, word: String },
    #[error("criterion uses a token that is no longer registered")]
    UnknownToken,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("`{spec}` is a {category} criterion, which is not allowed in {section}")]
    WrongCategory {
        spec: String,
        category: TokenCategory,
        section: Section,
    },
    #[error("`{spec}` needs a min/max/equal limit to be used as a condition")]
    MissingLimit { spec: String },
    #[error("`{spec}` carries a limit, which is not allowed in {section}")]
    UnexpectedLimit { spec: String, section: Section },
    #[error("`{spec}` expects a {expected} value")]
    ValueType { spec: String, expected: &'static str },
    #[error("`{spec}` is evaluated deferred and can only be used as a condition")]
    DeferredWeight { spec: String },
    #[error("`{spec}` has no cost registered")]
    MissingCost { spec: String },
    #[error("unknown relative value source `{0}`")]
    UnknownRelativeSource(String),
    #[error("unknown option parameter `{0}`")]
    UnknownParameter(String),
    #[error("option parameter `{name}` expects {expected}")]
    ParameterType { name: String, expected: &'static str },
    #[error("option index {index} is out of range (max {max})")]
    OptionOutOfRange { index: usize, max: usize },
}
