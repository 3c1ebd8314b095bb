//! Engine-free evaluation of specifications
//!
//! [`SpecificationRepository`] runs a specification over a plain vector so
//! specifications can be unit-tested without a query engine. Ordering, paging
//! and distinct follow the same step order as a real engine; include steps
//! and tracking have no effect.
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "testing")]
//! # fn main() {
//! use serde::Serialize;
//! use specificatr::testing::SpecificationRepository;
//! use specificatr::Specification;
//!
//! #[derive(Debug, Clone, PartialEq, Serialize)]
//! struct Point {
//!     x: i32,
//! }
//!
//! let repo = SpecificationRepository::new(vec![Point { x: 1 }, Point { x: 5 }]);
//! let spec = Specification::builder().filter(|p: &Point| p.x > 2).build();
//! assert_eq!(repo.get_all(spec).unwrap(), vec![Point { x: 5 }]);
//! # }
//! # #[cfg(not(feature = "testing"))]
//! # fn main() {}
//! ```

use serde::Serialize;

use crate::error::Result;
use crate::evaluator::SpecificationEvaluator;
use crate::query::Query;
use crate::specification::Specification;

/// Fixed in-memory rows queried through specifications
#[derive(Debug, Clone, Default)]
pub struct SpecificationRepository<T> {
    rows: Vec<T>,
}

impl<T: Serialize + Clone> SpecificationRepository<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Every row selected by `spec`
    pub fn get_all(&self, spec: Specification<T>) -> Result<Vec<T>> {
        let query = SpecificationEvaluator::get_query(Query::new(), spec)?;
        query.apply(self.rows.clone())
    }

    /// The first row selected by `spec`, or `None`
    pub fn get_single(&self, spec: Specification<T>) -> Result<Option<T>> {
        let query = SpecificationEvaluator::get_query(Query::new(), spec)?.take(1);
        Ok(query.apply(self.rows.clone())?.into_iter().next())
    }
}
