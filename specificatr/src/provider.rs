//! Repository registration
//!
//! A [`RepositoryProvider`] owns the configuration and one shared query
//! engine, and hands out repositories for any entity type on demand.
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use specificatr::prelude::*;
//! use specificatr::provider::RepositoryProvider;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Tag {
//!     id: u32,
//!     label: String,
//! }
//!
//! impl Entity for Tag {
//!     type Id = u32;
//!     const SET_NAME: &'static str = "tags";
//!
//!     fn id(&self) -> &u32 {
//!         &self.id
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> specificatr::Result<()> {
//! let provider = RepositoryProvider::in_memory(Config::default());
//! let tags = provider.repository::<Tag>();
//! tags.add(Tag { id: 1, label: "rust".into() }).await?;
//!
//! let read_only = provider.read_only::<Tag>();
//! assert_eq!(read_only.get_all(false).await?.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::config::Config;
use crate::engine::QueryEngine;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::repository::{ReadOnlyRepository, Repository};

#[cfg(feature = "memory")]
use crate::memory::MemoryContext;

/// Shared configuration and engine, handing out repositories per entity type
///
/// Cloning is cheap; all clones and all repositories share the engine.
#[derive(Debug)]
pub struct RepositoryProvider<E> {
    config: Config,
    engine: Arc<E>,
}

impl<E: QueryEngine> RepositoryProvider<E> {
    pub fn builder() -> RepositoryProviderBuilder<E> {
        RepositoryProviderBuilder::new()
    }

    /// Read-write repository for `T`
    pub fn repository<T: Entity>(&self) -> Repository<T, E> {
        tracing::trace!(entity_set = T::SET_NAME, "repository requested");
        Repository::new(Arc::clone(&self.engine))
    }

    /// Read-only repository for `T`
    pub fn read_only<T: Entity>(&self) -> ReadOnlyRepository<T, E> {
        tracing::trace!(entity_set = T::SET_NAME, "read-only repository requested");
        ReadOnlyRepository::new(Arc::clone(&self.engine))
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(feature = "memory")]
impl RepositoryProvider<MemoryContext> {
    /// Provider over a fresh [`MemoryContext`] configured from `config`
    pub fn in_memory(config: Config) -> Self {
        let engine = Arc::new(MemoryContext::from_config(&config));
        Self { config, engine }
    }
}

impl<E> Clone for RepositoryProvider<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            engine: Arc::clone(&self.engine),
        }
    }
}

/// Builder for [`RepositoryProvider`]
pub struct RepositoryProviderBuilder<E> {
    config: Option<Config>,
    engine: Option<Arc<E>>,
}

impl<E: QueryEngine> RepositoryProviderBuilder<E> {
    /// Create a new builder
    ///
    /// The configuration falls back to `Config::default()` when not provided;
    /// the engine is required.
    pub fn new() -> Self {
        Self {
            config: None,
            engine: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the shared query engine
    pub fn engine(mut self, engine: impl Into<Arc<E>>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn build(self) -> Result<RepositoryProvider<E>> {
        let engine = self
            .engine
            .ok_or_else(|| Error::Internal("RepositoryProvider requires a query engine".to_string()))?;
        let config = self.config.unwrap_or_default();

        tracing::debug!(context = %config.context.name, "repository provider built");
        Ok(RepositoryProvider { config, engine })
    }
}

impl<E: QueryEngine> Default for RepositoryProviderBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::repository::{ReadRepository, ReadWriteRepository};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tag {
        id: u32,
        label: String,
    }

    impl Entity for Tag {
        type Id = u32;
        const SET_NAME: &'static str = "tags";

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl Entity for Note {
        type Id = String;
        const SET_NAME: &'static str = "notes";

        fn id(&self) -> &String {
            &self.id
        }
    }

    #[test]
    fn test_build_requires_engine() {
        let result = RepositoryProvider::<MemoryContext>::builder().build();
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[test]
    fn test_build_defaults_config() {
        let provider = RepositoryProvider::<MemoryContext>::builder()
            .engine(MemoryContext::new())
            .build()
            .unwrap();
        assert_eq!(provider.config().context.name, "specificatr");
    }

    #[test]
    fn test_in_memory_uses_context_config() {
        let mut config = Config::default();
        config.context.name = "catalog".to_string();
        config.context.strict_includes = false;

        let provider = RepositoryProvider::in_memory(config);
        assert_eq!(provider.engine().config().name, "catalog");
        assert!(!provider.engine().config().strict_includes);
    }

    #[tokio::test]
    async fn test_repositories_share_engine() {
        let provider = RepositoryProvider::in_memory(Config::default());
        let tags = provider.repository::<Tag>();
        let notes = provider.clone().repository::<Note>();

        tags.add(Tag {
            id: 1,
            label: "rust".to_string(),
        })
        .await
        .unwrap();
        notes
            .add(Note {
                id: "n-1".to_string(),
                body: "hello".to_string(),
            })
            .await
            .unwrap();

        let read_only = provider.read_only::<Tag>();
        assert_eq!(read_only.get_all(false).await.unwrap().len(), 1);
        assert_eq!(provider.engine().stored_count::<Note>().await, 1);
    }
}
