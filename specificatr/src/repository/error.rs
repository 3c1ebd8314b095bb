//! Repository error types
//!
//! This module provides structured error types for repository operations,
//! allowing fine-grained error handling and meaningful error messages.
//!
//! # Example
//!
//! ```rust
//! use specificatr::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("users", "usr_123");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert!(error.entity_id.is_some());
//! ```

use std::fmt;

use crate::engine::EngineError;
use crate::error::Error;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Listing entities, with or without a specification
    GetAll,
    /// Finding a single entity by ID
    GetById,
    /// Finding the first entity matching a specification
    GetSingle,
    /// Executing a named raw query
    RawQuery,
    /// Counting entities for a paged result
    Count,
    /// Adding a new entity
    Add,
    /// Replacing an existing entity
    Update,
    /// Updating selected properties of an entity
    UpdateFields,
    /// Deleting an entity
    Delete,
    /// Deleting an entity by its ID
    DeleteById,
    /// Saving staged changes
    Commit,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetAll => write!(f, "get_all"),
            Self::GetById => write!(f, "get_by_id"),
            Self::GetSingle => write!(f, "get_single"),
            Self::RawQuery => write!(f, "raw_query"),
            Self::Count => write!(f, "count"),
            Self::Add => write!(f, "add"),
            Self::Update => write!(f, "update"),
            Self::UpdateFields => write!(f, "update_fields"),
            Self::Delete => write!(f, "delete"),
            Self::DeleteById => write!(f, "delete_by_id"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Entity was not found
    NotFound,
    /// Entity already exists (duplicate key)
    AlreadyExists,
    /// Input was rejected before reaching the engine
    ValidationFailed,
    /// A property selector has a shape the operation cannot use
    UnsupportedSelector,
    /// A single-result operation matched more than one row
    MultipleResults,
    /// The query engine rejected the operation
    EngineError,
    /// Serialization or deserialization error
    SerializationError,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::UnsupportedSelector => write!(f, "unsupported_selector"),
            Self::MultipleResults => write!(f, "multiple_results"),
            Self::EngineError => write!(f, "engine_error"),
            Self::SerializationError => write!(f, "serialization_error"),
        }
    }
}

/// Structured repository error with operation context
///
/// Provides detailed information about what operation failed, why it failed,
/// and which entity was involved.
///
/// # Example
///
/// ```rust
/// use specificatr::repository::{RepositoryError, RepositoryOperation};
///
/// let error = RepositoryError::not_found("users", "usr_abc123")
///     .with_operation(RepositoryOperation::DeleteById);
/// assert_eq!(
///     error.to_string(),
///     "Repository not_found error during delete_by_id: Entity not found [users: usr_abc123]"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The entity set involved (e.g., "users", "orders")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    ///
    /// # Example
    ///
    /// ```rust
    /// use specificatr::repository::RepositoryError;
    ///
    /// let error = RepositoryError::not_found("users", "usr_123");
    /// assert_eq!(error.entity_type, Some("users".to_string()));
    /// ```
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::GetById,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create an "already exists" error with entity context
    pub fn already_exists(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Add,
            RepositoryErrorKind::AlreadyExists,
            "Entity already exists",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create a validation failed error
    pub fn validation_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ValidationFailed, message)
    }

    /// Create an unsupported selector error for a partial update
    pub fn unsupported_selector(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::UpdateFields,
            RepositoryErrorKind::UnsupportedSelector,
            message,
        )
    }

    /// Create an error for a single-result query that matched `count` rows
    pub fn multiple_results(operation: RepositoryOperation, count: usize) -> Self {
        Self::new(
            operation,
            RepositoryErrorKind::MultipleResults,
            format!("Expected at most one entity, found {count}"),
        )
    }

    /// Create an engine error
    pub fn engine_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::EngineError, message)
    }

    /// Create a serialization error
    pub fn serialization_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::SerializationError, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Add the entity set without a specific entity
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Attach repository context to an error raised below the repository
    ///
    /// Engine and serialization failures become [`Error::Repository`];
    /// selector and configuration errors pass through unchanged.
    pub fn from_error(operation: RepositoryOperation, entity_type: &str, error: Error) -> Error {
        let repository_error = match error {
            Error::Engine(EngineError::DuplicateKey { key, .. }) => {
                Self::already_exists(entity_type, key).with_operation(operation)
            }
            Error::Engine(EngineError::MissingRow { key, .. }) => {
                Self::not_found(entity_type, key).with_operation(operation)
            }
            Error::Engine(
                err @ (EngineError::NotTracked { .. } | EngineError::UnknownProperty { .. }),
            ) => Self::validation_failed(operation, err.to_string()).with_entity_type(entity_type),
            Error::Engine(err) => {
                Self::engine_error(operation, err.to_string()).with_entity_type(entity_type)
            }
            Error::Serialization(err) => {
                Self::serialization_error(operation, err.to_string()).with_entity_type(entity_type)
            }
            Error::Repository(err) => err,
            other => return other,
        };
        Error::Repository(repository_error)
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::SelectorError;

    #[test]
    fn test_repository_operation_display() {
        assert_eq!(format!("{}", RepositoryOperation::GetAll), "get_all");
        assert_eq!(format!("{}", RepositoryOperation::GetById), "get_by_id");
        assert_eq!(format!("{}", RepositoryOperation::RawQuery), "raw_query");
        assert_eq!(
            format!("{}", RepositoryOperation::UpdateFields),
            "update_fields"
        );
        assert_eq!(
            format!("{}", RepositoryOperation::DeleteById),
            "delete_by_id"
        );
        assert_eq!(format!("{}", RepositoryOperation::Commit), "commit");
    }

    #[test]
    fn test_repository_error_kind_display() {
        assert_eq!(format!("{}", RepositoryErrorKind::NotFound), "not_found");
        assert_eq!(
            format!("{}", RepositoryErrorKind::UnsupportedSelector),
            "unsupported_selector"
        );
        assert_eq!(
            format!("{}", RepositoryErrorKind::MultipleResults),
            "multiple_results"
        );
        assert_eq!(format!("{}", RepositoryErrorKind::EngineError), "engine_error");
        assert_eq!(
            format!("{}", RepositoryErrorKind::SerializationError),
            "serialization_error"
        );
    }

    #[test]
    fn test_not_found_convenience() {
        let error = RepositoryError::not_found("users", "usr_123");
        assert_eq!(error.operation, RepositoryOperation::GetById);
        assert_eq!(error.kind, RepositoryErrorKind::NotFound);
        assert_eq!(error.entity_type, Some("users".to_string()));
        assert_eq!(error.entity_id, Some("usr_123".to_string()));
    }

    #[test]
    fn test_already_exists_convenience() {
        let error = RepositoryError::already_exists("users", "7");
        assert_eq!(error.operation, RepositoryOperation::Add);
        assert_eq!(error.kind, RepositoryErrorKind::AlreadyExists);
    }

    #[test]
    fn test_display_without_entity() {
        let error = RepositoryError::multiple_results(RepositoryOperation::RawQuery, 3);
        let display = format!("{}", error);
        assert!(display.contains("multiple_results"));
        assert!(display.contains("raw_query"));
        assert!(display.contains("found 3"));
        assert!(!display.contains("["));
    }

    #[test]
    fn test_from_error_maps_engine_errors() {
        let err = RepositoryError::from_error(
            RepositoryOperation::Update,
            "users",
            EngineError::MissingRow {
                entity_set: "users".to_string(),
                key: "9".to_string(),
            }
            .into(),
        );
        let Error::Repository(err) = err else {
            panic!("expected a repository error");
        };
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.operation, RepositoryOperation::Update);
        assert_eq!(err.entity_id, Some("9".to_string()));
    }

    #[test]
    fn test_from_error_keeps_selector_errors() {
        let err = RepositoryError::from_error(
            RepositoryOperation::GetAll,
            "users",
            SelectorError::EmptySelector.into(),
        );
        assert!(matches!(err, Error::Selector(SelectorError::EmptySelector)));
    }

    #[test]
    fn test_error_is_error_trait() {
        let error: Box<dyn std::error::Error> = Box::new(RepositoryError::not_found("users", "123"));
        assert!(error.to_string().contains("not_found"));
    }
}
