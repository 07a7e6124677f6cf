//! Text form of criteria: `[limit_]word[_glue_object][_around_object]`.
//!
//! ```text
//! min_distance_from_attentionTarget
//! hidespots_from_attentionTarget_around_puppet
//! pureGrid_around_puppet
//! ```

use crate::criterion::Criterion;
use crate::error::ParseError;
use crate::token::{Limit, Token, TokenCategory};
use crate::vocabulary::Vocabulary;
use crate::words;

pub const DELIMITER: char = '_';
pub const MAX_WORDS: usize = 8;

/// Token quadruple produced by [`parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedSpec {
    pub query: Token,
    pub limit: Option<Limit>,
    pub object: Option<Token>,
    pub object_aux: Option<Token>,
}

struct Words<'s> {
    spec: &'s str,
    words: Vec<&'s str>,
    next: usize,
}

impl<'s> Words<'s> {
    fn peek(&self) -> Option<&'s str> {
        self.words.get(self.next).copied()
    }

    fn take(&mut self, expected: &'static str) -> Result<&'s str, ParseError> {
        let word = self.peek().ok_or_else(|| ParseError::MissingWord {
            spec: self.spec.to_owned(),
            expected,
        })?;
        self.next += 1;
        Ok(word)
    }

    fn unknown(&self, word: &str) -> ParseError {
        ParseError::UnknownWord {
            spec: self.spec.to_owned(),
            word: word.to_owned(),
        }
    }

    fn expected(&self, word: &str, expected: &'static str) -> ParseError {
        ParseError::Expected {
            spec: self.spec.to_owned(),
            word: word.to_owned(),
            expected,
        }
    }
}

pub fn parse(vocabulary: &Vocabulary, spec: &str) -> Result<ParsedSpec, ParseError> {
    if spec.is_empty() {
        return Err(ParseError::Empty);
    }
    let split: Vec<&str> = spec.split(DELIMITER).collect();
    if split.len() > MAX_WORDS {
        return Err(ParseError::TooManyWords {
            spec: spec.to_owned(),
            count: split.len(),
            max: MAX_WORDS,
        });
    }
    if split.iter().any(|w| w.is_empty()) {
        return Err(ParseError::EmptyWord {
            spec: spec.to_owned(),
        });
    }

    let mut cursor = Words {
        spec,
        words: split,
        next: 0,
    };

    let first = cursor.take("a criterion word")?;
    let mut token = vocabulary
        .translate(first)
        .ok_or_else(|| cursor.unknown(first))?;

    let mut limit = None;
    if token.category() == TokenCategory::Limit {
        limit = Limit::from_token(token);
        let word = cursor.take("a criterion word")?;
        token = vocabulary
            .translate(word)
            .ok_or_else(|| cursor.unknown(word))?;
    }

    let category = token.category();
    if !(category.is_scoring() || category.is_generator()) {
        let word = vocabulary.describe(token);
        return Err(ParseError::UnexpectedWord {
            spec: spec.to_owned(),
            word,
        });
    }

    let mut object = None;
    let mut object_aux = None;

    if matches!(
        category,
        TokenCategory::Test | TokenCategory::Measure | TokenCategory::GeneratorWithObject
    ) {
        expect_glue(vocabulary, &mut cursor)?;
        let target = take_object(vocabulary, &mut cursor)?;
        if category == TokenCategory::GeneratorWithObject {
            object_aux = Some(target);
        } else {
            object = Some(target);
        }
    }

    if category.is_generator() {
        let word = cursor.take("`around`")?;
        match vocabulary.lookup(word) {
            Some(t) if t == words::AROUND => {}
            _ => return Err(cursor.expected(word, "`around`")),
        }
        object = Some(take_object(vocabulary, &mut cursor)?);
    }

    if let Some(word) = cursor.peek() {
        return Err(ParseError::TrailingWords {
            spec: spec.to_owned(),
            word: word.to_owned(),
        });
    }

    Ok(ParsedSpec {
        query: token,
        limit,
        object,
        object_aux,
    })
}

fn expect_glue(vocabulary: &Vocabulary, cursor: &mut Words<'_>) -> Result<(), ParseError> {
    let word = cursor.take("a glue word")?;
    match vocabulary.lookup(word) {
        Some(t) if t == words::GLUE => Ok(()),
        _ => Err(cursor.expected(word, "a glue word")),
    }
}

fn take_object(vocabulary: &Vocabulary, cursor: &mut Words<'_>) -> Result<Token, ParseError> {
    let word = cursor.take("an object")?;
    match vocabulary.translate(word) {
        Some(t) if t.category() == TokenCategory::Object => Ok(t),
        Some(_) => Err(cursor.expected(word, "an object")),
        None => Err(cursor.unknown(word)),
    }
}

/// Text form of a criterion, without its value. Parsing the result yields the same tokens.
pub fn unparse(vocabulary: &Vocabulary, criterion: &Criterion) -> Result<String, ParseError> {
    let name = |token: Token| {
        vocabulary
            .lookup_name(token)
            .ok_or(ParseError::UnknownToken)
    };

    let mut out = Vec::with_capacity(MAX_WORDS);
    if let Some(limit) = criterion.limit() {
        out.push(name(limit.token())?);
    }
    out.push(name(criterion.query())?);

    let category = criterion.category();
    let glued = if category == TokenCategory::GeneratorWithObject {
        criterion.object_aux()
    } else if category.is_generator() {
        None
    } else {
        criterion.object()
    };
    if let Some(target) = glued {
        out.push("from");
        out.push(name(target)?);
    }
    if category.is_generator() {
        if let Some(center) = criterion.object() {
            out.push(name(words::AROUND)?);
            out.push(name(center)?);
        }
    }

    Ok(out.join("_"))
}
