//! Crate-wide error type

use thiserror::Error;

use crate::engine::EngineError;
use crate::repository::RepositoryError;
use crate::selector::SelectorError;

/// Errors raised while building, evaluating or executing queries
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// A selector could not be resolved into a field or include path
    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),

    /// The query engine rejected an operation
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// Structured repository error with operation context
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Entity (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A `LIKE` pattern could not be compiled
    #[error("Invalid LIKE pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The global tracing subscriber could not be installed
    #[error("Tracing error: {0}")]
    Tracing(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

/// Result type alias using the crate [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
