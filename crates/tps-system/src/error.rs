use std::time::Duration;

use thiserror::Error;
use tps_core::{BuildError, QueryId, VocabularyError};

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("unknown query {0:?}")]
    UnknownQuery(QueryId),

    #[error("a query named `{0}` already exists")]
    DuplicateName(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),

    #[error("unknown word `{0}`")]
    UnknownWord(String),

    #[error("`{0}` is not a generator word")]
    NotAGenerator(String),

    #[error("a query must ask for at least one point")]
    InvalidCount,

    #[error("query `{0}` has an option without generators")]
    NotRunnable(String),

    #[error("query `{0}` could not be evaluated")]
    EvaluationFailed(String),

    #[error("query `{query}` did not finish within {elapsed:?}")]
    TimedOut { query: String, elapsed: Duration },

    #[error("query definition `{query}`: {source}")]
    Definition {
        query: String,
        #[source]
        source: Box<SystemError>,
    },
}
