//! Query engine boundary
//!
//! Repositories never touch storage directly. They build a [`Query`], hand it
//! to a [`QueryEngine`] and use the engine's change tracker for writes. The
//! crate ships [`MemoryContext`](crate::memory::MemoryContext) as the
//! reference engine; adapters for real databases implement the same trait.
//!
//! Methods use RPITIT (return position `impl Trait` in traits), so no boxing
//! or `async_trait` is involved.

use std::fmt;
use std::future::Future;

use thiserror::Error;

use crate::entity::Entity;
use crate::error::Result;
use crate::query::Query;
use crate::specification::FilterValue;

/// A named raw query with positional parameters
///
/// # Example
///
/// ```rust
/// use specificatr::{FilterValue, RawQuery};
///
/// let raw = RawQuery::new("by_email").bind("ada@example.com");
/// assert_eq!(raw.name(), "by_email");
/// assert_eq!(raw.params(), &[FilterValue::from("ada@example.com")]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuery {
    name: String,
    params: Vec<FilterValue>,
}

impl RawQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append the next positional parameter
    #[must_use]
    pub fn bind(mut self, value: impl Into<FilterValue>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[FilterValue] {
        &self.params
    }
}

impl fmt::Display for RawQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.to_json())?;
        }
        write!(f, ")")
    }
}

/// Failures reported by a query engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Duplicate key '{key}' in entity set '{entity_set}'")]
    DuplicateKey { entity_set: String, key: String },

    #[error("No row with key '{key}' in entity set '{entity_set}'")]
    MissingRow { entity_set: String, key: String },

    #[error("Entity with key '{key}' in entity set '{entity_set}' is not tracked")]
    NotTracked { entity_set: String, key: String },

    #[error("Unknown property '{property}' on entity set '{entity_set}'")]
    UnknownProperty { entity_set: String, property: String },

    #[error("Include path '{path}' does not start with a navigation of entity set '{entity_set}'")]
    UnknownNavigation { entity_set: String, path: String },

    #[error("Unknown raw query '{name}' for entity set '{entity_set}'")]
    UnknownRawQuery { entity_set: String, name: String },
}

/// Operations a repository needs from the underlying data context
///
/// Writes are staged in the engine's change tracker and only reach storage
/// on [`save_changes`](QueryEngine::save_changes).
pub trait QueryEngine: Send + Sync + 'static {
    /// Base query over the entity set of `T`
    fn query<T: Entity>(&self) -> Query<T> {
        Query::new()
    }

    /// Materialize a query
    fn fetch<T: Entity>(&self, query: Query<T>) -> impl Future<Output = Result<Vec<T>>> + Send;

    /// Number of rows a query would return
    fn count<T: Entity>(&self, query: Query<T>) -> impl Future<Output = Result<usize>> + Send;

    /// Primary-key lookup, not subject to default query filters
    fn find<T: Entity>(
        &self,
        id: &T::Id,
        tracking: bool,
    ) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Execute a named raw query; results are not tracked
    fn raw<T: Entity>(&self, raw: RawQuery) -> impl Future<Output = Result<Vec<T>>> + Send;

    /// Stage an insert
    fn add<T: Entity>(&self, entity: T) -> impl Future<Output = Result<()>> + Send;

    /// Stage a delete
    fn remove<T: Entity>(&self, entity: &T) -> impl Future<Output = Result<()>> + Send;

    /// Stage a full update
    fn update<T: Entity>(&self, entity: T) -> impl Future<Output = Result<()>> + Send;

    /// Start tracking `entity` as unchanged
    fn attach<T: Entity>(&self, entity: T) -> impl Future<Output = Result<()>> + Send;

    /// Flag one property of a tracked entity as modified
    fn mark_modified<T: Entity>(
        &self,
        id: &T::Id,
        property: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Apply staged changes, returning the number of affected rows
    ///
    /// All or nothing: when any change fails, nothing is applied and every
    /// staged change is discarded.
    fn save_changes(&self) -> impl Future<Output = Result<usize>> + Send;

    /// Drop every staged change, returning how many were discarded
    fn discard_changes(&self) -> impl Future<Output = usize> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_query_display() {
        let raw = RawQuery::new("older_than").bind(30).bind("x");
        assert_eq!(raw.to_string(), "older_than(30, \"x\")");
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::DuplicateKey {
            entity_set: "users".to_string(),
            key: "1".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate key '1' in entity set 'users'");
    }
}
