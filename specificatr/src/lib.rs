//! # specificatr
//!
//! Specification pattern and generic repositories over a query engine.
//!
//! A [`Specification`] captures everything one query needs (criteria,
//! eager-load paths, ordering, paging, distinctness, tracking mode and the
//! default filter bypass) as a single reusable value. The
//! [`SpecificationEvaluator`] translates it into a deferred [`Query`], and
//! the generic [`Repository`](repository::Repository) materializes queries on
//! any [`QueryEngine`].
//!
//! ## Features
//!
//! - **Specifications**: fluent builder with closure or field-condition criteria
//! - **Selectors**: explicit property expressions for includes, ordering and partial updates
//! - **Evaluator**: fixed-order translation, with a count-aware variant for paging
//! - **Repositories**: read and read-write traits with structured errors
//! - **In-memory engine**: default filters, raw queries and a change tracker (`memory` feature)
//!
//! ## Example
//!
//! ```rust,no_run
//! use serde::{Deserialize, Serialize};
//! use specificatr::prelude::*;
//! use specificatr::provider::RepositoryProvider;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Customer {
//!     id: u64,
//!     name: String,
//!     orders: Vec<u64>,
//! }
//!
//! impl Entity for Customer {
//!     type Id = u64;
//!     const SET_NAME: &'static str = "customers";
//!
//!     fn id(&self) -> &u64 {
//!         &self.id
//!     }
//!
//!     fn navigations() -> &'static [&'static str] {
//!         &["orders"]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     init_tracing(&config)?;
//!
//!     let provider = RepositoryProvider::in_memory(config);
//!     let customers = provider.repository::<Customer>();
//!
//!     let spec = Specification::builder()
//!         .condition(FilterCondition::like("name", "A%"))
//!         .include(Selector::field("orders"))
//!         .order_by(Selector::field("name"), OrderByDirection::Ascending)
//!         .paging(1, 20)
//!         .build();
//!
//!     let page = customers.get_all_paged(spec).await?;
//!     println!("{} of {} customers", page.items.len(), page.total_count);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod evaluator;
pub mod observability;
pub mod path;
pub mod provider;
pub mod query;
pub mod repository;
pub mod resolver;
pub mod selector;
pub mod specification;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

mod value;

pub use config::Config;
pub use engine::{EngineError, QueryEngine, RawQuery};
pub use entity::{Entity, EntityId};
pub use error::{Error, Result};
pub use evaluator::{CountedQuery, SpecificationEvaluator};
pub use path::FieldPath;
pub use query::{OrderedQuery, Query, QueryStep};
pub use resolver::IncludePathResolver;
pub use selector::{Selector, SelectorError};
pub use specification::{
    ConditionMatcher, Criteria, FilterCondition, FilterOperator, FilterValue, OrderByDirection,
    OrderByExpression, PagedResult, Paging, Specification, SpecificationBuilder,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::{QueryEngine, RawQuery};
    pub use crate::entity::Entity;
    pub use crate::error::{Error, Result};
    pub use crate::evaluator::SpecificationEvaluator;
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        ReadOnlyRepository, ReadRepository, ReadWriteRepository, Repository, RepositoryError,
        RepositoryErrorKind,
    };
    pub use crate::selector::Selector;
    pub use crate::specification::{
        Criteria, FilterCondition, FilterValue, OrderByDirection, PagedResult, Specification,
    };

    #[cfg(feature = "memory")]
    pub use crate::memory::MemoryContext;
}
