use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use super::error::{RepositoryError, RepositoryOperation};
use super::traits::{ReadRepository, ReadWriteRepository};
use crate::engine::{QueryEngine, RawQuery};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::evaluator::SpecificationEvaluator;
use crate::selector::Selector;
use crate::specification::{Criteria, PagedResult, Specification};

/// Adds repository context to errors coming from the engine
fn context<T: Entity>(operation: RepositoryOperation) -> impl FnOnce(Error) -> Error {
    move |error| RepositoryError::from_error(operation, T::SET_NAME, error)
}

/// Generic repository over a shared query engine
///
/// One instance per entity type; instances are cheap to clone and share the
/// engine (and with it the change tracker).
pub struct Repository<T, E> {
    engine: Arc<E>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity, E: QueryEngine> Repository<T, E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            _entity: PhantomData,
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// A view of this repository without write access
    pub fn read_only(&self) -> ReadOnlyRepository<T, E> {
        ReadOnlyRepository {
            inner: self.clone(),
        }
    }

    /// Looks up `id` through the default filters, the same way `get_by_id` does
    async fn find_visible(
        &self,
        id: &T::Id,
        as_tracking: bool,
        operation: RepositoryOperation,
    ) -> Result<Option<T>> {
        let wanted = id.clone();
        let query = self
            .engine
            .query::<T>()
            .filter(Criteria::predicate(move |entity: &T| *entity.id() == wanted))
            .take(1);
        let query = if as_tracking {
            query.as_tracking()
        } else {
            query.as_no_tracking()
        };

        let found = self
            .engine
            .fetch(query)
            .await
            .map_err(context::<T>(operation))?;
        Ok(found.into_iter().next())
    }

    /// Drops whatever a failed write left staged so the next save starts clean
    async fn rollback<R>(&self, operation: RepositoryOperation, result: Result<R>) -> Result<R> {
        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let discarded = self.engine.discard_changes().await;
        tracing::warn!(
            entity_set = T::SET_NAME,
            %operation,
            error = %err,
            discarded,
            "write failed, staged changes discarded"
        );
        Err(err)
    }

    async fn save(&self, operation: RepositoryOperation) -> Result<usize> {
        let affected = self
            .engine
            .save_changes()
            .await
            .map_err(context::<T>(operation))?;
        debug!(entity_set = T::SET_NAME, %operation, affected, "committed");
        Ok(affected)
    }
}

impl<T, E> Clone for Repository<T, E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity, E> fmt::Debug for Repository<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity_set", &T::SET_NAME)
            .finish()
    }
}

impl<T: Entity, E: QueryEngine> ReadRepository<T> for Repository<T, E> {
    async fn get_all(&self, as_tracking: bool) -> Result<Vec<T>> {
        let query = self.engine.query::<T>();
        let query = if as_tracking {
            query.as_tracking()
        } else {
            query.as_no_tracking()
        };
        self.engine
            .fetch(query)
            .await
            .map_err(context::<T>(RepositoryOperation::GetAll))
    }

    async fn get_all_by_specification(&self, spec: Specification<T>) -> Result<Vec<T>> {
        let query = SpecificationEvaluator::get_query(self.engine.query::<T>(), spec)?;
        self.engine
            .fetch(query)
            .await
            .map_err(context::<T>(RepositoryOperation::GetAll))
    }

    async fn get_all_paged(&self, spec: Specification<T>) -> Result<PagedResult<T>> {
        let counted = SpecificationEvaluator::get_query_with_count(self.engine.query::<T>(), spec)?;
        let total_count = self
            .engine
            .count(counted.count_query)
            .await
            .map_err(context::<T>(RepositoryOperation::Count))?;
        let items = self
            .engine
            .fetch(counted.query)
            .await
            .map_err(context::<T>(RepositoryOperation::GetAll))?;

        debug!(
            entity_set = T::SET_NAME,
            items = items.len(),
            total_count,
            "fetched page"
        );
        Ok(PagedResult::new(items, total_count))
    }

    async fn get_by_id(&self, id: &T::Id, as_tracking: bool) -> Result<Option<T>> {
        self.find_visible(id, as_tracking, RepositoryOperation::GetById)
            .await
    }

    async fn get_single_by_specification(&self, spec: Specification<T>) -> Result<Option<T>> {
        let query = SpecificationEvaluator::get_query(self.engine.query::<T>(), spec)?.take(1);
        let found = self
            .engine
            .fetch(query)
            .await
            .map_err(context::<T>(RepositoryOperation::GetSingle))?;
        Ok(found.into_iter().next())
    }

    async fn get_by_raw_query(&self, raw: RawQuery) -> Result<Vec<T>> {
        self.engine
            .raw(raw)
            .await
            .map_err(context::<T>(RepositoryOperation::RawQuery))
    }

    async fn get_single_by_raw_query(&self, raw: RawQuery) -> Result<Option<T>> {
        let name = raw.name().to_string();
        let mut rows = self.get_by_raw_query(raw).await?;
        if rows.len() > 1 {
            let err = RepositoryError::multiple_results(RepositoryOperation::RawQuery, rows.len())
                .with_entity_type(T::SET_NAME);
            tracing::warn!(entity_set = T::SET_NAME, query = %name, rows = rows.len(), "raw query returned more than one row");
            return Err(err.into());
        }
        Ok(rows.pop())
    }
}

impl<T: Entity, E: QueryEngine> ReadWriteRepository<T> for Repository<T, E> {
    async fn add(&self, entity: T) -> Result<T> {
        let operation = RepositoryOperation::Add;
        debug!(entity_set = T::SET_NAME, id = %entity.id(), "adding entity");
        let written = async {
            self.engine
                .add(entity.clone())
                .await
                .map_err(context::<T>(operation))?;
            self.save(operation).await
        }
        .await;
        self.rollback(operation, written).await?;
        Ok(entity)
    }

    async fn delete(&self, entity: &T) -> Result<()> {
        let operation = RepositoryOperation::Delete;
        debug!(entity_set = T::SET_NAME, id = %entity.id(), "deleting entity");
        let written = async {
            self.engine
                .remove(entity)
                .await
                .map_err(context::<T>(operation))?;
            self.save(operation).await
        }
        .await;
        self.rollback(operation, written).await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &T::Id) -> Result<()> {
        let operation = RepositoryOperation::DeleteById;
        let Some(entity) = self.find_visible(id, false, operation).await? else {
            return Err(RepositoryError::not_found(T::SET_NAME, id.to_string())
                .with_operation(operation)
                .into());
        };

        debug!(entity_set = T::SET_NAME, %id, "deleting entity by id");
        let written = async {
            self.engine
                .remove(&entity)
                .await
                .map_err(context::<T>(operation))?;
            self.save(operation).await
        }
        .await;
        self.rollback(operation, written).await?;
        Ok(())
    }

    async fn update(&self, entity: T) -> Result<T> {
        let operation = RepositoryOperation::Update;
        debug!(entity_set = T::SET_NAME, id = %entity.id(), "updating entity");
        let written = async {
            self.engine
                .update(entity.clone())
                .await
                .map_err(context::<T>(operation))?;
            self.save(operation).await
        }
        .await;
        self.rollback(operation, written).await?;
        Ok(entity)
    }

    async fn update_fields(&self, entity: T, selectors: &[Selector]) -> Result<()> {
        if selectors.is_empty() {
            return Err(RepositoryError::validation_failed(
                RepositoryOperation::UpdateFields,
                "At least one property selector is required",
            )
            .with_entity(T::SET_NAME, entity.id().to_string())
            .into());
        }

        let properties = selectors
            .iter()
            .map(|selector| {
                selector.scalar_property().map_err(|err| {
                    tracing::warn!(%selector, "rejected update selector");
                    RepositoryError::unsupported_selector(err.to_string())
                        .with_entity(T::SET_NAME, entity.id().to_string())
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            entity_set = T::SET_NAME,
            id = %entity.id(),
            properties = ?properties,
            "updating entity fields"
        );

        let operation = RepositoryOperation::UpdateFields;
        let id = entity.id().clone();
        let written = async {
            self.engine
                .attach(entity)
                .await
                .map_err(context::<T>(operation))?;
            for property in &properties {
                self.engine
                    .mark_modified::<T>(&id, property)
                    .await
                    .map_err(context::<T>(operation))?;
            }
            self.save(operation).await
        }
        .await;
        self.rollback(operation, written).await?;
        Ok(())
    }

    async fn add_or_update(&self, entity: T) -> Result<T> {
        let existing = self
            .find_visible(entity.id(), false, RepositoryOperation::GetById)
            .await?;
        match existing {
            Some(_) => self.update(entity).await,
            None => self.add(entity).await,
        }
    }

    async fn commit(&self) -> Result<usize> {
        self.save(RepositoryOperation::Commit).await
    }
}

/// Read-only view of a [`Repository`]
pub struct ReadOnlyRepository<T, E> {
    inner: Repository<T, E>,
}

impl<T: Entity, E: QueryEngine> ReadOnlyRepository<T, E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            inner: Repository::new(engine),
        }
    }
}

impl<T, E> Clone for ReadOnlyRepository<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Entity, E> fmt::Debug for ReadOnlyRepository<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyRepository")
            .field("entity_set", &T::SET_NAME)
            .finish()
    }
}

impl<T: Entity, E: QueryEngine> From<Repository<T, E>> for ReadOnlyRepository<T, E> {
    fn from(inner: Repository<T, E>) -> Self {
        Self { inner }
    }
}

impl<T: Entity, E: QueryEngine> ReadRepository<T> for ReadOnlyRepository<T, E> {
    async fn get_all(&self, as_tracking: bool) -> Result<Vec<T>> {
        self.inner.get_all(as_tracking).await
    }

    async fn get_all_by_specification(&self, spec: Specification<T>) -> Result<Vec<T>> {
        self.inner.get_all_by_specification(spec).await
    }

    async fn get_all_paged(&self, spec: Specification<T>) -> Result<PagedResult<T>> {
        self.inner.get_all_paged(spec).await
    }

    async fn get_by_id(&self, id: &T::Id, as_tracking: bool) -> Result<Option<T>> {
        self.inner.get_by_id(id, as_tracking).await
    }

    async fn get_single_by_specification(&self, spec: Specification<T>) -> Result<Option<T>> {
        self.inner.get_single_by_specification(spec).await
    }

    async fn get_by_raw_query(&self, raw: RawQuery) -> Result<Vec<T>> {
        self.inner.get_by_raw_query(raw).await
    }

    async fn get_single_by_raw_query(&self, raw: RawQuery) -> Result<Option<T>> {
        self.inner.get_single_by_raw_query(raw).await
    }
}
