/// Why a single criterion could not be evaluated for a point.
///
/// These never escape an evaluation: the point (or, during generation and setup, the option)
/// is dropped and evaluation carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalFailure {
    #[error("object `{0}` is not available in this context")]
    ObjectUnavailable(String),
    #[error("criterion `{0}` is missing its object")]
    MissingObject(String),
    #[error("nothing could evaluate `{0}`")]
    Unhandled(String),
    #[error("no value range is known for `{0}`")]
    NoRange(String),
    #[error("`{0}` cannot be evaluated here")]
    WrongCategory(String),
    #[error("no deferred service is available for `{0}`")]
    DeferredUnavailable(String),
    #[error("deferred evaluation of `{0}` failed")]
    DeferredFailed(String),
    #[error("generator `{0}` rejected its parameters")]
    BadParameters(String),
}
