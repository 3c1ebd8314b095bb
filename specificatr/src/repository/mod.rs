//! Generic repositories over a query engine
//!
//! This module provides the repository traits and a generic implementation
//! that turns [`Specification`](crate::Specification)s into engine queries.
//!
//! # Features
//!
//! - **Read access**: [`ReadRepository`] for lookups, specification queries and raw queries
//! - **Write access**: [`ReadWriteRepository`] for adds, updates, partial updates and deletes
//! - **Generic implementation**: [`Repository`] over any [`QueryEngine`](crate::QueryEngine)
//! - **Structured errors**: [`RepositoryError`] with operation and entity context
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serde::{Deserialize, Serialize};
//! use specificatr::memory::MemoryContext;
//! use specificatr::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Order {
//!     id: u64,
//!     total: f64,
//! }
//!
//! impl Entity for Order {
//!     type Id = u64;
//!     const SET_NAME: &'static str = "orders";
//!
//!     fn id(&self) -> &u64 {
//!         &self.id
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> specificatr::Result<()> {
//! let orders = Repository::<Order, _>::new(Arc::new(MemoryContext::new()));
//! orders.add(Order { id: 1, total: 250.0 }).await?;
//! orders.add(Order { id: 2, total: 40.0 }).await?;
//!
//! let spec = Specification::builder()
//!     .condition(FilterCondition::gt("total", 100.0))
//!     .build();
//! assert_eq!(orders.get_all_by_specification(spec).await?.len(), 1);
//! # Ok(())
//! # }
//! ```

mod error;
mod generic;
mod traits;

// Re-export all public types
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use generic::{ReadOnlyRepository, Repository};
pub use traits::{ReadRepository, ReadWriteRepository};
