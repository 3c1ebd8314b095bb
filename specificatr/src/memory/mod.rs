//! In-memory query engine
//!
//! [`MemoryContext`] keeps every entity set as serialized rows and runs
//! queries with [`Query::apply`]. It supports default query filters, include
//! validation, named raw queries and a change tracker whose staged writes are
//! applied atomically by `save_changes`.
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use specificatr::memory::MemoryContext;
//! use specificatr::{Criteria, Entity, QueryEngine};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Note {
//!     id: u32,
//!     archived: bool,
//! }
//!
//! impl Entity for Note {
//!     type Id = u32;
//!     const SET_NAME: &'static str = "notes";
//!     fn id(&self) -> &u32 {
//!         &self.id
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let context = MemoryContext::builder()
//!     .query_filter::<Note>(Criteria::predicate(|n: &Note| !n.archived))
//!     .build();
//!
//! context.add(Note { id: 1, archived: false }).await.unwrap();
//! context.add(Note { id: 2, archived: true }).await.unwrap();
//! assert_eq!(context.save_changes().await.unwrap(), 2);
//!
//! let visible = context.fetch(context.query::<Note>()).await.unwrap();
//! assert_eq!(visible.len(), 1);
//! # }
//! ```

mod store;
mod tracker;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::config::{Config, ContextConfig};
use crate::engine::{EngineError, QueryEngine, RawQuery};
use crate::entity::Entity;
use crate::error::Result;
use crate::query::Query;
use crate::specification::{Criteria, FilterValue};

pub use tracker::EntryState;

use store::Store;
use tracker::ChangeTracker;

/// Body of a named raw query: decides for one row whether it is returned
pub type RawQueryFn<T> = Arc<dyn Fn(&T, &[FilterValue]) -> bool + Send + Sync>;

type Registration = Box<dyn Any + Send + Sync>;

struct Inner {
    config: ContextConfig,
    store: RwLock<Store>,
    tracker: Mutex<ChangeTracker>,
    query_filters: HashMap<TypeId, Registration>,
    raw_queries: HashMap<(TypeId, String), Registration>,
}

/// Shared handle to an in-memory data context
///
/// Cloning is cheap; clones share rows and the change tracker.
#[derive(Clone)]
pub struct MemoryContext {
    inner: Arc<Inner>,
}

impl MemoryContext {
    /// Context with default settings and no registrations
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MemoryContextBuilder {
        MemoryContextBuilder::new()
    }

    /// Context configured from the `context` section of `config`
    pub fn from_config(config: &Config) -> Self {
        Self::builder().config(config.context.clone()).build()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    /// Number of stored rows of `T`, ignoring filters and staged changes
    pub async fn stored_count<T: Entity>(&self) -> usize {
        self.inner.store.read().await.len(T::SET_NAME)
    }

    /// Tracking state of the entity with `id`, if tracked
    pub async fn entry_state<T: Entity>(&self, id: &T::Id) -> Option<EntryState> {
        self.inner
            .tracker
            .lock()
            .await
            .state(T::SET_NAME, &id.to_string())
            .cloned()
    }

    /// Number of tracked entities across all entity sets
    pub async fn tracked_count(&self) -> usize {
        self.inner.tracker.lock().await.len()
    }

    /// Stop tracking every entity, discarding staged changes
    pub async fn clear_tracker(&self) {
        self.inner.tracker.lock().await.clear();
        tracing::debug!(context = %self.inner.config.name, "change tracker cleared");
    }

    fn query_filter<T: Entity>(&self) -> Option<&Criteria<T>> {
        self.inner
            .query_filters
            .get(&TypeId::of::<T>())
            .and_then(|filter| filter.downcast_ref::<Criteria<T>>())
    }

    fn raw_query<T: Entity>(&self, name: &str) -> Option<&RawQueryFn<T>> {
        self.inner
            .raw_queries
            .get(&(TypeId::of::<T>(), name.to_string()))
            .and_then(|query| query.downcast_ref::<RawQueryFn<T>>())
    }

    fn validate_includes<T: Entity>(&self, query: &Query<T>) -> Result<()> {
        if !self.inner.config.strict_includes {
            return Ok(());
        }
        for path in query.includes() {
            let known = path
                .first()
                .is_some_and(|root| T::navigations().iter().any(|nav| *nav == root));
            if !known {
                tracing::warn!(
                    context = %self.inner.config.name,
                    entity_set = T::SET_NAME,
                    include = %path,
                    "rejected include path"
                );
                return Err(EngineError::UnknownNavigation {
                    entity_set: T::SET_NAME.to_string(),
                    path: path.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Deserialize the stored rows of `T`, applying its default filter unless bypassed
    async fn load<T: Entity>(&self, ignore_query_filters: bool) -> Result<Vec<T>> {
        let rows = {
            let store = self.inner.store.read().await;
            store
                .rows(T::SET_NAME)
                .map(|row| serde_json::from_value::<T>(row.clone()))
                .collect::<std::result::Result<Vec<T>, _>>()?
        };

        match self.query_filter::<T>() {
            Some(filter) if !ignore_query_filters => {
                let matcher = filter.matcher()?;
                let mut visible = Vec::with_capacity(rows.len());
                for row in rows {
                    if matcher.matches(&row)? {
                        visible.push(row);
                    }
                }
                Ok(visible)
            }
            _ => Ok(rows),
        }
    }

    async fn track_unchanged<T: Entity>(&self, rows: &[T]) -> Result<()> {
        let mut tracker = self.inner.tracker.lock().await;
        for row in rows {
            tracker.track_unchanged(T::SET_NAME, row.id().to_string(), serde_json::to_value(row)?);
        }
        Ok(())
    }
}

impl Default for MemoryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContext")
            .field("config", &self.inner.config)
            .field("query_filters", &self.inner.query_filters.len())
            .field("raw_queries", &self.inner.raw_queries.len())
            .finish()
    }
}

impl QueryEngine for MemoryContext {
    async fn fetch<T: Entity>(&self, query: Query<T>) -> Result<Vec<T>> {
        self.validate_includes(&query)?;
        let rows = self.load::<T>(query.ignores_query_filters()).await?;
        let rows = query.apply(rows)?;
        if query.is_tracking() {
            self.track_unchanged(&rows).await?;
        }

        tracing::debug!(
            context = %self.inner.config.name,
            entity_set = T::SET_NAME,
            rows = rows.len(),
            tracking = query.is_tracking(),
            "fetched rows"
        );
        Ok(rows)
    }

    async fn count<T: Entity>(&self, query: Query<T>) -> Result<usize> {
        self.validate_includes(&query)?;
        let rows = self.load::<T>(query.ignores_query_filters()).await?;
        let count = query.apply(rows)?.len();
        tracing::debug!(
            context = %self.inner.config.name,
            entity_set = T::SET_NAME,
            count,
            "counted rows"
        );
        Ok(count)
    }

    async fn find<T: Entity>(&self, id: &T::Id, tracking: bool) -> Result<Option<T>> {
        let key = id.to_string();
        let row = self.inner.store.read().await.get(T::SET_NAME, &key).cloned();
        let Some(row) = row else {
            return Ok(None);
        };

        let entity = serde_json::from_value::<T>(row.clone())?;
        if tracking {
            self.inner
                .tracker
                .lock()
                .await
                .track_unchanged(T::SET_NAME, key, row);
        }
        Ok(Some(entity))
    }

    async fn raw<T: Entity>(&self, raw: RawQuery) -> Result<Vec<T>> {
        let Some(body) = self.raw_query::<T>(raw.name()) else {
            return Err(EngineError::UnknownRawQuery {
                entity_set: T::SET_NAME.to_string(),
                name: raw.name().to_string(),
            }
            .into());
        };

        let rows: Vec<T> = self
            .load::<T>(false)
            .await?
            .into_iter()
            .filter(|row| body(row, raw.params()))
            .collect();

        tracing::debug!(
            context = %self.inner.config.name,
            entity_set = T::SET_NAME,
            query = %raw,
            rows = rows.len(),
            "executed raw query"
        );
        Ok(rows)
    }

    async fn add<T: Entity>(&self, entity: T) -> Result<()> {
        let value = serde_json::to_value(&entity)?;
        self.inner
            .tracker
            .lock()
            .await
            .add(T::SET_NAME, entity.id().to_string(), value)?;
        Ok(())
    }

    async fn remove<T: Entity>(&self, entity: &T) -> Result<()> {
        let value = serde_json::to_value(entity)?;
        self.inner
            .tracker
            .lock()
            .await
            .remove(T::SET_NAME, entity.id().to_string(), value);
        Ok(())
    }

    async fn update<T: Entity>(&self, entity: T) -> Result<()> {
        let value = serde_json::to_value(&entity)?;
        self.inner
            .tracker
            .lock()
            .await
            .update(T::SET_NAME, entity.id().to_string(), value);
        Ok(())
    }

    async fn attach<T: Entity>(&self, entity: T) -> Result<()> {
        let value = serde_json::to_value(&entity)?;
        self.inner
            .tracker
            .lock()
            .await
            .attach(T::SET_NAME, entity.id().to_string(), value);
        Ok(())
    }

    async fn mark_modified<T: Entity>(&self, id: &T::Id, property: &str) -> Result<()> {
        self.inner
            .tracker
            .lock()
            .await
            .mark_modified(T::SET_NAME, id.to_string(), property)?;
        Ok(())
    }

    async fn save_changes(&self) -> Result<usize> {
        let mut store = self.inner.store.write().await;
        let mut tracker = self.inner.tracker.lock().await;

        let applied = store.apply(&tracker.changes());
        let affected = match applied {
            Ok(affected) => affected,
            Err(err) => {
                let discarded = tracker.reject_changes(&store);
                tracing::warn!(
                    context = %self.inner.config.name,
                    error = %err,
                    discarded,
                    "save failed, staged changes discarded"
                );
                return Err(err.into());
            }
        };
        tracker.accept_changes(&store);

        tracing::debug!(context = %self.inner.config.name, affected, "saved changes");
        Ok(affected)
    }

    async fn discard_changes(&self) -> usize {
        let store = self.inner.store.read().await;
        let discarded = self.inner.tracker.lock().await.reject_changes(&store);
        if discarded > 0 {
            tracing::debug!(context = %self.inner.config.name, discarded, "discarded staged changes");
        }
        discarded
    }
}

/// Builder for [`MemoryContext`]
///
/// Default query filters and raw queries are registered per entity type
/// before the context is built; a built context is immutable apart from its
/// rows and change tracker.
pub struct MemoryContextBuilder {
    config: ContextConfig,
    query_filters: HashMap<TypeId, Registration>,
    raw_queries: HashMap<(TypeId, String), Registration>,
}

impl MemoryContextBuilder {
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
            query_filters: HashMap::new(),
            raw_queries: HashMap::new(),
        }
    }

    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the default filter of `T`, replacing any earlier one
    ///
    /// Every query over `T` applies it unless the query ignores query filters.
    pub fn query_filter<T: Entity>(mut self, criteria: impl Into<Criteria<T>>) -> Self {
        self.query_filters
            .insert(TypeId::of::<T>(), Box::new(criteria.into()));
        self
    }

    /// Register a named raw query over `T`
    pub fn raw_query<T: Entity>(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&T, &[FilterValue]) -> bool + Send + Sync + 'static,
    ) -> Self {
        let body: RawQueryFn<T> = Arc::new(body);
        self.raw_queries
            .insert((TypeId::of::<T>(), name.into()), Box::new(body));
        self
    }

    pub fn build(self) -> MemoryContext {
        tracing::debug!(
            context = %self.config.name,
            strict_includes = self.config.strict_includes,
            query_filters = self.query_filters.len(),
            raw_queries = self.raw_queries.len(),
            "memory context created"
        );
        MemoryContext {
            inner: Arc::new(Inner {
                config: self.config,
                store: RwLock::new(Store::default()),
                tracker: Mutex::new(ChangeTracker::default()),
                query_filters: self.query_filters,
                raw_queries: self.raw_queries,
            }),
        }
    }
}

impl Default for MemoryContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
