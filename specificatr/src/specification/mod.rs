//! Specifications: reusable query intent
//!
//! A [`Specification`] bundles everything a read operation needs to know:
//! which rows (criteria), which navigations to eager-load (includes), in which
//! order, which page, whether results stay tracked, whether duplicates are
//! dropped and whether the engine's default query filters apply.
//!
//! Specifications are immutable once built; all mutation goes through
//! [`SpecificationBuilder`].
//!
//! # Example
//!
//! ```rust
//! use serde::Serialize;
//! use specificatr::{OrderByDirection, Selector, Specification};
//!
//! #[derive(Clone, Serialize)]
//! struct Order {
//!     number: u32,
//!     total: f64,
//! }
//!
//! let spec = Specification::<Order>::builder()
//!     .filter(|o| o.total > 100.0)
//!     .include(Selector::field("Lines").select(|line| line.member("Product")))
//!     .order_by(Selector::field("total"), OrderByDirection::Descending)
//!     .then_by(Selector::field("number"), OrderByDirection::Ascending)
//!     .paging(1, 20)
//!     .build();
//!
//! assert_eq!(spec.order_by().len(), 2);
//! assert!(spec.paging().is_some());
//! ```

mod criteria;
mod filter;
mod order;
mod paging;

use std::fmt;
use std::sync::Arc;

pub use criteria::{Criteria, DistinctComparer, Predicate};
pub use filter::{ConditionMatcher, FilterCondition, FilterOperator, FilterValue};
pub use order::{OrderByDirection, OrderByExpression};
pub use paging::{PagedResult, Paging};

use crate::selector::Selector;

/// Query intent for entities of type `T`
pub struct Specification<T> {
    criteria: Option<Criteria<T>>,
    includes: Vec<Selector>,
    order_by: Vec<OrderByExpression>,
    paging: Option<Paging>,
    as_tracking: bool,
    distinct: bool,
    distinct_comparer: Option<DistinctComparer<T>>,
    ignore_query_filters: bool,
}

impl<T> Specification<T> {
    /// Start building a specification
    pub fn builder() -> SpecificationBuilder<T> {
        SpecificationBuilder::new()
    }

    /// A specification with no criteria, includes, ordering or paging
    pub fn all() -> Self {
        SpecificationBuilder::new().build()
    }

    pub fn criteria(&self) -> Option<&Criteria<T>> {
        self.criteria.as_ref()
    }

    /// Include selectors, in insertion order without duplicates
    pub fn includes(&self) -> &[Selector] {
        &self.includes
    }

    /// Ordering keys; the first is the primary key, the rest break ties
    pub fn order_by(&self) -> &[OrderByExpression] {
        &self.order_by
    }

    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }

    pub fn as_tracking(&self) -> bool {
        self.as_tracking
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn distinct_comparer(&self) -> Option<&DistinctComparer<T>> {
        self.distinct_comparer.as_ref()
    }

    pub fn ignore_query_filters(&self) -> bool {
        self.ignore_query_filters
    }

    /// Reopen a builder seeded with this specification
    pub fn to_builder(&self) -> SpecificationBuilder<T> {
        SpecificationBuilder {
            spec: self.clone(),
        }
    }
}

impl<T> Clone for Specification<T> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            includes: self.includes.clone(),
            order_by: self.order_by.clone(),
            paging: self.paging,
            as_tracking: self.as_tracking,
            distinct: self.distinct,
            distinct_comparer: self.distinct_comparer.clone(),
            ignore_query_filters: self.ignore_query_filters,
        }
    }
}

impl<T> Default for Specification<T> {
    fn default() -> Self {
        Self::all()
    }
}

impl<T> fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("criteria", &self.criteria)
            .field("includes", &self.includes)
            .field("order_by", &self.order_by)
            .field("paging", &self.paging)
            .field("as_tracking", &self.as_tracking)
            .field("distinct", &self.distinct)
            .field("distinct_comparer", &self.distinct_comparer.as_ref().map(|_| "<fn>"))
            .field("ignore_query_filters", &self.ignore_query_filters)
            .finish()
    }
}

/// Builder for [`Specification`]
///
/// Every setter consumes and returns the builder. Adding an include or an
/// ordering key that is already present is a no-op.
pub struct SpecificationBuilder<T> {
    spec: Specification<T>,
}

impl<T> SpecificationBuilder<T> {
    pub fn new() -> Self {
        Self {
            spec: Specification {
                criteria: None,
                includes: Vec::new(),
                order_by: Vec::new(),
                paging: None,
                as_tracking: false,
                distinct: false,
                distinct_comparer: None,
                ignore_query_filters: false,
            },
        }
    }

    /// Set the typed filter predicate, keeping any field conditions
    pub fn filter(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        let criteria = self.spec.criteria.take().unwrap_or_default();
        self.spec.criteria = Some(criteria.with_predicate(predicate));
        self
    }

    /// Add a field condition; conditions are combined with AND
    pub fn condition(mut self, condition: FilterCondition) -> Self {
        let criteria = self.spec.criteria.take().unwrap_or_default();
        self.spec.criteria = Some(criteria.and(condition));
        self
    }

    /// Replace the whole criteria
    pub fn criteria(mut self, criteria: impl Into<Criteria<T>>) -> Self {
        self.spec.criteria = Some(criteria.into());
        self
    }

    /// Add a navigation to eager-load
    pub fn include(mut self, selector: Selector) -> Self {
        if !self.spec.includes.contains(&selector) {
            self.spec.includes.push(selector);
        }
        self
    }

    /// Add an ordering key
    ///
    /// The first key added is the primary ordering; later keys break ties in
    /// insertion order.
    pub fn order_by(mut self, selector: Selector, direction: OrderByDirection) -> Self {
        let expression = OrderByExpression::new(selector, direction);
        if !self.spec.order_by.contains(&expression) {
            self.spec.order_by.push(expression);
        }
        self
    }

    /// Alias of [`order_by`](Self::order_by) that reads better for secondary keys
    pub fn then_by(self, selector: Selector, direction: OrderByDirection) -> Self {
        self.order_by(selector, direction)
    }

    /// Enable paging with a 1-based page index
    pub fn paging(mut self, page_index: u32, page_size: u32) -> Self {
        self.spec.paging = Some(Paging::new(page_index, page_size));
        self
    }

    /// Keep fetched entities attached to the engine's change tracker
    pub fn as_tracking(mut self) -> Self {
        self.spec.as_tracking = true;
        self
    }

    /// Drop duplicate rows using structural equality
    pub fn distinct(mut self) -> Self {
        self.spec.distinct = true;
        self.spec.distinct_comparer = None;
        self
    }

    /// Drop duplicate rows using `comparer`; the first of each group is kept
    pub fn distinct_by(mut self, comparer: impl Fn(&T, &T) -> bool + Send + Sync + 'static) -> Self {
        self.spec.distinct = true;
        self.spec.distinct_comparer = Some(Arc::new(comparer));
        self
    }

    /// Bypass the engine's default query filters
    pub fn ignore_query_filters(mut self) -> Self {
        self.spec.ignore_query_filters = true;
        self
    }

    pub fn build(self) -> Specification<T> {
        self.spec
    }
}

impl<T> Default for SpecificationBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Item {
        name: String,
    }

    #[test]
    fn test_defaults() {
        let spec = Specification::<Item>::all();
        assert!(spec.criteria().is_none());
        assert!(spec.includes().is_empty());
        assert!(spec.order_by().is_empty());
        assert!(spec.paging().is_none());
        assert!(!spec.as_tracking());
        assert!(!spec.is_distinct());
        assert!(!spec.ignore_query_filters());
    }

    #[test]
    fn test_includes_are_deduplicated_in_insertion_order() {
        let spec = Specification::<Item>::builder()
            .include(Selector::field("Parent"))
            .include(Selector::field("Children").select(|c| c.member("Toys")))
            .include(Selector::path("Parent"))
            .build();
        assert_eq!(spec.includes().len(), 2);
        assert_eq!(spec.includes()[0], Selector::field("Parent"));
    }

    #[test]
    fn test_order_by_deduplicates_structurally() {
        let spec = Specification::<Item>::builder()
            .order_by(Selector::field("Name"), OrderByDirection::Ascending)
            .then_by(Selector::field("Number"), OrderByDirection::Descending)
            .then_by(Selector::field("Name"), OrderByDirection::Ascending)
            .build();
        assert_eq!(spec.order_by().len(), 2);
        assert_eq!(spec.order_by()[1].direction, OrderByDirection::Descending);
    }

    #[test]
    fn test_filter_keeps_conditions() {
        let spec = Specification::<Item>::builder()
            .condition(FilterCondition::eq("name", "a"))
            .filter(|i| !i.name.is_empty())
            .build();
        let criteria = spec.criteria().unwrap();
        assert!(criteria.has_predicate());
        assert_eq!(criteria.field_conditions().len(), 1);
    }

    #[test]
    fn test_distinct_by_sets_comparer() {
        let spec = Specification::<Item>::builder()
            .distinct_by(|a, b| a.name.eq_ignore_ascii_case(&b.name))
            .build();
        assert!(spec.is_distinct());
        assert!(spec.distinct_comparer().is_some());

        let plain = spec.to_builder().distinct().build();
        assert!(plain.distinct_comparer().is_none());
    }

    #[test]
    fn test_flags() {
        let spec = Specification::<Item>::builder()
            .as_tracking()
            .ignore_query_filters()
            .paging(2, 10)
            .build();
        assert!(spec.as_tracking());
        assert!(spec.ignore_query_filters());
        assert_eq!(spec.paging(), Some(Paging::new(2, 10)));
    }
}
