//! Repository trait definitions
//!
//! Generic read and read-write access to entities, using RPITIT (Return
//! Position Impl Trait In Traits) so implementations are plain `async fn`s
//! without `async_trait`.
//!
//! # Overview
//!
//! - [`ReadRepository`]: lookups, specification queries and raw queries
//! - [`ReadWriteRepository`]: adds, updates and deletes; every write commits
//!
//! Lookups return empty results when nothing matches. Operations that target
//! one existing entity by id fail with
//! [`RepositoryErrorKind::NotFound`](super::RepositoryErrorKind::NotFound)
//! when it does not exist.

use std::future::Future;

use crate::engine::RawQuery;
use crate::entity::Entity;
use crate::error::Result;
use crate::selector::Selector;
use crate::specification::{PagedResult, Specification};

/// Read access to entities of type `T`
///
/// # Example
///
/// ```rust,no_run
/// use serde::{Deserialize, Serialize};
/// use specificatr::prelude::*;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Order {
///     id: u64,
///     total: f64,
/// }
///
/// impl Entity for Order {
///     type Id = u64;
///     const SET_NAME: &'static str = "orders";
///
///     fn id(&self) -> &u64 {
///         &self.id
///     }
/// }
///
/// async fn large_orders(orders: &impl ReadRepository<Order>) -> Result<()> {
///     let spec = Specification::<Order>::builder()
///         .filter(|o| o.total > 100.0)
///         .order_by(Selector::field("total"), OrderByDirection::Descending)
///         .paging(1, 20)
///         .build();
///
///     let page = orders.get_all_paged(spec).await?;
///     println!("{} of {} orders", page.items.len(), page.total_count);
///     Ok(())
/// }
/// ```
pub trait ReadRepository<T: Entity>: Send + Sync {
    /// All entities, honoring default query filters
    fn get_all(&self, as_tracking: bool) -> impl Future<Output = Result<Vec<T>>> + Send;

    /// Entities selected by a specification
    fn get_all_by_specification(
        &self,
        spec: Specification<T>,
    ) -> impl Future<Output = Result<Vec<T>>> + Send;

    /// One page selected by a specification, with the total count before paging
    fn get_all_paged(
        &self,
        spec: Specification<T>,
    ) -> impl Future<Output = Result<PagedResult<T>>> + Send;

    /// The entity with `id`, or `None`
    fn get_by_id(
        &self,
        id: &T::Id,
        as_tracking: bool,
    ) -> impl Future<Output = Result<Option<T>>> + Send;

    /// The first entity selected by a specification, or `None`
    fn get_single_by_specification(
        &self,
        spec: Specification<T>,
    ) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Entities returned by a named raw query
    fn get_by_raw_query(&self, raw: RawQuery) -> impl Future<Output = Result<Vec<T>>> + Send;

    /// The only entity returned by a named raw query, or `None`
    ///
    /// # Errors
    ///
    /// Fails with `MultipleResults` when the query returns more than one row.
    fn get_single_by_raw_query(
        &self,
        raw: RawQuery,
    ) -> impl Future<Output = Result<Option<T>>> + Send;
}

/// Read and write access to entities of type `T`
pub trait ReadWriteRepository<T: Entity>: ReadRepository<T> {
    /// Insert `entity` and commit
    ///
    /// # Errors
    ///
    /// Fails with `AlreadyExists` when an entity with the same id is stored.
    fn add(&self, entity: T) -> impl Future<Output = Result<T>> + Send;

    /// Delete `entity` and commit; deleting an unknown entity is not an error
    fn delete(&self, entity: &T) -> impl Future<Output = Result<()>> + Send;

    /// Delete the entity with `id` and commit
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` when no entity has this id.
    fn delete_by_id(&self, id: &T::Id) -> impl Future<Output = Result<()>> + Send;

    /// Replace the stored entity with `entity` and commit
    fn update(&self, entity: T) -> impl Future<Output = Result<T>> + Send;

    /// Persist only the properties named by `selectors` and commit
    ///
    /// Each selector must be a direct property access, optionally wrapped in
    /// a conversion (`x => x.Name`, `x => (object)x.Number`).
    ///
    /// # Errors
    ///
    /// Fails with `ValidationFailed` when `selectors` is empty and with
    /// `UnsupportedSelector` for any other selector shape.
    fn update_fields(
        &self,
        entity: T,
        selectors: &[Selector],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Add `entity` when its id is unknown, update it otherwise
    fn add_or_update(&self, entity: T) -> impl Future<Output = Result<T>> + Send;

    /// Save staged changes, returning the number of affected rows
    fn commit(&self) -> impl Future<Output = Result<usize>> + Send;
}
