use std::collections::BTreeMap;

use crate::error::VocabularyError;
use crate::token::{Cost, CostClass, Token, TokenCategory};
use crate::words;

/// Bidirectional word table plus per-token cost.
///
/// Name lookups are case-sensitive. All glue synonyms translate to [`words::GLUE`], whose
/// reverse lookup is always `glue`.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    by_name: BTreeMap<String, Token>,
    by_token: BTreeMap<Token, String>,
    costs: BTreeMap<Token, Cost>,
    next_extension: BTreeMap<TokenCategory, u16>,
    cost_counters: [i32; 4],
}

impl Vocabulary {
    /// An empty table. Most callers want [`Vocabulary::with_core_words`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_core_words() -> Self {
        let mut vocabulary = Self::new();
        vocabulary.register_core_words();
        vocabulary
    }

    /// Seeds every core word and its cost. Idempotent.
    pub fn register_core_words(&mut self) {
        for &(token, name, cost) in words::CORE_WORDS {
            if self.by_token.contains_key(&token) {
                continue;
            }
            self.insert(name, token);
            if let Some(class) = cost {
                self.apply_cost(token, class);
            }
        }
        for glue in words::GLUE_WORDS {
            self.by_name.insert(glue.to_owned(), words::GLUE);
        }
        self.by_token.insert(words::GLUE, "glue".to_owned());
    }

    /// Adds a new word to an extensible category.
    ///
    /// Scoring words always end up with a cost. When none is given the word is treated as
    /// expensive and a warning is logged.
    pub fn extend(
        &mut self,
        name: &str,
        category: TokenCategory,
        cost: Option<CostClass>,
    ) -> Result<Token, VocabularyError> {
        if !category.is_extensible() {
            return Err(VocabularyError::NotExtensible(category));
        }
        if name.is_empty() || name.contains(crate::parse::DELIMITER) {
            return Err(VocabularyError::InvalidName(name.to_owned()));
        }
        if self.by_name.contains_key(name) {
            tracing::warn!(word = name, "word is already registered");
            return Err(VocabularyError::Duplicate(name.to_owned()));
        }

        let next = self
            .next_extension
            .entry(category)
            .or_insert_with(|| category.extension_start());
        if *next >= category.capacity() {
            tracing::warn!(word = name, %category, "no room left for extension words");
            return Err(VocabularyError::Exhausted(category));
        }
        let token = Token::new(category, *next);
        *next += 1;

        self.insert(name, token);
        if category.is_scoring() {
            let class = cost.unwrap_or_else(|| {
                tracing::warn!(
                    word = name,
                    "no cost supplied for scoring word, assuming expensive"
                );
                CostClass::Expensive
            });
            self.apply_cost(token, class);
        }
        tracing::debug!(word = name, ?token, "extended vocabulary");
        Ok(token)
    }

    /// Looks up a word, logging when it is unknown.
    pub fn translate(&self, name: &str) -> Option<Token> {
        let token = self.lookup(name);
        if token.is_none() {
            tracing::warn!(word = name, "unknown word");
        }
        token
    }

    /// Looks up a word without logging.
    pub fn lookup(&self, name: &str) -> Option<Token> {
        self.by_name.get(name).copied()
    }

    /// Reverse lookup, logging when the token is unknown.
    pub fn name(&self, token: Token) -> Option<&str> {
        let name = self.lookup_name(token);
        if name.is_none() {
            tracing::warn!(?token, "unknown token");
        }
        name
    }

    pub fn lookup_name(&self, token: Token) -> Option<&str> {
        self.by_token.get(&token).map(String::as_str)
    }

    /// Display name for diagnostics; falls back to the raw token.
    pub fn describe(&self, token: Token) -> String {
        match self.lookup_name(token) {
            Some(name) => name.to_owned(),
            None => format!("{}#{}", token.category(), token.index()),
        }
    }

    pub fn contains(&self, token: Token) -> bool {
        self.by_token.contains_key(&token)
    }

    pub fn cost(&self, token: Token) -> Option<Cost> {
        self.costs.get(&token).copied()
    }

    /// Every registered token with its canonical name, ordered by token.
    pub fn iter(&self) -> impl Iterator<Item = (Token, &str)> + '_ {
        self.by_token.iter().map(|(t, n)| (*t, n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    fn insert(&mut self, name: &str, token: Token) {
        self.by_name.insert(name.to_owned(), token);
        self.by_token.insert(token, name.to_owned());
    }

    fn apply_cost(&mut self, token: Token, class: CostClass) {
        // Each application within a class gets a distinct, increasing cost.
        let counter = &mut self.cost_counters[class.slot()];
        let cost = Cost(class.base() + *counter);
        *counter += 1;
        self.costs.insert(token, cost);
    }
}
