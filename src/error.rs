use simple_error::SimpleError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("area not found: {0}")]
    NotFound(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<SimpleError> for Error {
    fn from(err: SimpleError) -> Self {
        Error::Configuration(err.as_str().to_owned())
    }
}
