//! Deferred queries
//!
//! A [`Query`] records query operators without running them. Engines inspect
//! the recorded steps (includes, options) and materialize the query; the
//! in-memory engine runs them with [`Query::apply`].
//!
//! Ordering is only reachable through [`Query::order_by`], which returns an
//! [`OrderedQuery`]; secondary keys can only be added there, so a then-by is
//! never recorded without a primary ordering in front of it.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::path::FieldPath;
use crate::specification::{Criteria, DistinctComparer, OrderByDirection};
use crate::value::compare_values;

/// One recorded query operator
pub enum QueryStep<T> {
    Filter(Criteria<T>),
    Include(FieldPath),
    Skip(usize),
    Take(usize),
    OrderBy {
        key: FieldPath,
        direction: OrderByDirection,
    },
    ThenBy {
        key: FieldPath,
        direction: OrderByDirection,
    },
    Distinct(Option<DistinctComparer<T>>),
}

impl<T> QueryStep<T> {
    fn needs_serialized(&self) -> bool {
        match self {
            QueryStep::Filter(criteria) => criteria.needs_serialized(),
            QueryStep::OrderBy { .. } | QueryStep::ThenBy { .. } => true,
            QueryStep::Distinct(comparer) => comparer.is_none(),
            QueryStep::Include(_) | QueryStep::Skip(_) | QueryStep::Take(_) => false,
        }
    }
}

impl<T> Clone for QueryStep<T> {
    fn clone(&self) -> Self {
        match self {
            QueryStep::Filter(criteria) => QueryStep::Filter(criteria.clone()),
            QueryStep::Include(path) => QueryStep::Include(path.clone()),
            QueryStep::Skip(n) => QueryStep::Skip(*n),
            QueryStep::Take(n) => QueryStep::Take(*n),
            QueryStep::OrderBy { key, direction } => QueryStep::OrderBy {
                key: key.clone(),
                direction: *direction,
            },
            QueryStep::ThenBy { key, direction } => QueryStep::ThenBy {
                key: key.clone(),
                direction: *direction,
            },
            QueryStep::Distinct(comparer) => QueryStep::Distinct(comparer.clone()),
        }
    }
}

impl<T> fmt::Debug for QueryStep<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryStep::Filter(criteria) => f.debug_tuple("Filter").field(criteria).finish(),
            QueryStep::Include(path) => write!(f, "Include({path})"),
            QueryStep::Skip(n) => write!(f, "Skip({n})"),
            QueryStep::Take(n) => write!(f, "Take({n})"),
            QueryStep::OrderBy { key, direction } => write!(f, "OrderBy({key} {direction})"),
            QueryStep::ThenBy { key, direction } => write!(f, "ThenBy({key} {direction})"),
            QueryStep::Distinct(None) => write!(f, "Distinct"),
            QueryStep::Distinct(Some(_)) => write!(f, "Distinct(<fn>)"),
        }
    }
}

/// Deferred query over entities of type `T`
///
/// New queries are tracked and honor default query filters.
///
/// # Example
///
/// ```rust
/// use serde::Serialize;
/// use specificatr::{Criteria, OrderByDirection, Query};
///
/// #[derive(Clone, Serialize)]
/// struct Row {
///     n: i32,
/// }
///
/// let query = Query::<Row>::new()
///     .filter(Criteria::predicate(|r: &Row| r.n % 2 == 0))
///     .order_by("n", OrderByDirection::Descending)
///     .into_query()
///     .take(2);
///
/// let rows = (1..=6).map(|n| Row { n }).collect();
/// let result: Vec<i32> = query.apply(rows).unwrap().into_iter().map(|r| r.n).collect();
/// assert_eq!(result, vec![6, 4]);
/// ```
pub struct Query<T> {
    steps: Vec<QueryStep<T>>,
    ignore_query_filters: bool,
    tracking: bool,
}

impl<T> Query<T> {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            ignore_query_filters: false,
            tracking: true,
        }
    }

    #[must_use]
    pub fn filter(mut self, criteria: Criteria<T>) -> Self {
        self.steps.push(QueryStep::Filter(criteria));
        self
    }

    /// Record a navigation path to eager-load
    #[must_use]
    pub fn include(mut self, path: impl Into<FieldPath>) -> Self {
        self.steps.push(QueryStep::Include(path.into()));
        self
    }

    #[must_use]
    pub fn skip(mut self, count: usize) -> Self {
        self.steps.push(QueryStep::Skip(count));
        self
    }

    #[must_use]
    pub fn take(mut self, count: usize) -> Self {
        self.steps.push(QueryStep::Take(count));
        self
    }

    /// Sort by `key`, replacing the effect of any earlier ordering
    pub fn order_by(mut self, key: impl Into<FieldPath>, direction: OrderByDirection) -> OrderedQuery<T> {
        self.steps.push(QueryStep::OrderBy {
            key: key.into(),
            direction,
        });
        OrderedQuery { query: self }
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.steps.push(QueryStep::Distinct(None));
        self
    }

    #[must_use]
    pub fn distinct_by(mut self, comparer: DistinctComparer<T>) -> Self {
        self.steps.push(QueryStep::Distinct(Some(comparer)));
        self
    }

    /// Bypass the engine's default query filters
    #[must_use]
    pub fn ignore_query_filters(mut self) -> Self {
        self.ignore_query_filters = true;
        self
    }

    #[must_use]
    pub fn as_tracking(mut self) -> Self {
        self.tracking = true;
        self
    }

    #[must_use]
    pub fn as_no_tracking(mut self) -> Self {
        self.tracking = false;
        self
    }

    pub fn steps(&self) -> &[QueryStep<T>] {
        &self.steps
    }

    /// Recorded include paths, in order
    pub fn includes(&self) -> impl Iterator<Item = &FieldPath> {
        self.steps.iter().filter_map(|step| match step {
            QueryStep::Include(path) => Some(path),
            _ => None,
        })
    }

    pub fn ignores_query_filters(&self) -> bool {
        self.ignore_query_filters
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }
}

impl<T: Serialize> Query<T> {
    /// Run the recorded steps over an in-memory sequence
    ///
    /// Steps run in the order they were recorded. Sorting is stable: rows with
    /// equal keys keep their relative order, and then-by keys only decide
    /// between rows the preceding keys consider equal. Include steps are
    /// no-ops here because in-memory rows already carry their navigations.
    ///
    /// # Errors
    ///
    /// Fails when a row cannot be serialized for field conditions, ordering
    /// or structural distinct, or when a `LIKE` pattern cannot be compiled.
    pub fn apply(&self, rows: Vec<T>) -> crate::Result<Vec<T>> {
        let needs_serialized = self.steps.iter().any(QueryStep::needs_serialized);
        let mut rows = rows
            .into_iter()
            .map(|row| {
                let serialized = if needs_serialized {
                    serde_json::to_value(&row)?
                } else {
                    Value::Null
                };
                Ok((row, serialized))
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let mut index = 0;
        while index < self.steps.len() {
            match &self.steps[index] {
                QueryStep::Filter(criteria) => {
                    let matcher = criteria.matcher()?;
                    rows.retain(|(row, serialized)| matcher.matches_serialized(row, serialized));
                }
                QueryStep::Include(_) => {}
                QueryStep::Skip(count) => {
                    rows.drain(..(*count).min(rows.len()));
                }
                QueryStep::Take(count) => rows.truncate(*count),
                QueryStep::OrderBy { key, direction } | QueryStep::ThenBy { key, direction } => {
                    let mut keys = vec![(key, *direction)];
                    while let Some(QueryStep::ThenBy { key, direction }) = self.steps.get(index + 1) {
                        keys.push((key, *direction));
                        index += 1;
                    }
                    sort_rows(&mut rows, &keys);
                }
                QueryStep::Distinct(None) => {
                    let mut seen = HashSet::new();
                    rows.retain(|(_, serialized)| seen.insert(serialized.to_string()));
                }
                QueryStep::Distinct(Some(comparer)) => {
                    let mut kept: Vec<(T, Value)> = Vec::with_capacity(rows.len());
                    for (row, serialized) in rows {
                        if !kept.iter().any(|(existing, _)| comparer(existing, &row)) {
                            kept.push((row, serialized));
                        }
                    }
                    rows = kept;
                }
            }
            index += 1;
        }

        Ok(rows.into_iter().map(|(row, _)| row).collect())
    }
}

fn sort_rows<T>(rows: &mut [(T, Value)], keys: &[(&FieldPath, OrderByDirection)]) {
    rows.sort_by(|(_, a), (_, b)| {
        keys.iter()
            .map(|(key, direction)| {
                let ordering = compare_values(
                    key.lookup(a).unwrap_or(&Value::Null),
                    key.lookup(b).unwrap_or(&Value::Null),
                );
                match direction {
                    OrderByDirection::Ascending => ordering,
                    OrderByDirection::Descending => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

impl<T> Default for Query<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
            ignore_query_filters: self.ignore_query_filters,
            tracking: self.tracking,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("steps", &self.steps)
            .field("ignore_query_filters", &self.ignore_query_filters)
            .field("tracking", &self.tracking)
            .finish()
    }
}

/// A query whose last step is an ordering
pub struct OrderedQuery<T> {
    query: Query<T>,
}

impl<T> OrderedQuery<T> {
    /// Add a secondary ordering key
    pub fn then_by(mut self, key: impl Into<FieldPath>, direction: OrderByDirection) -> Self {
        self.query.steps.push(QueryStep::ThenBy {
            key: key.into(),
            direction,
        });
        self
    }

    pub fn into_query(self) -> Query<T> {
        self.query
    }
}

impl<T> From<OrderedQuery<T>> for Query<T> {
    fn from(ordered: OrderedQuery<T>) -> Self {
        ordered.query
    }
}

impl<T> Clone for OrderedQuery<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
        }
    }
}

impl<T> fmt::Debug for OrderedQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OrderedQuery").field(&self.query).finish()
    }
}

/// Convenience for building comparers without naming the `Arc`
pub fn comparer<T>(f: impl Fn(&T, &T) -> bool + Send + Sync + 'static) -> DistinctComparer<T> {
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::FilterCondition;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Row {
        group: &'static str,
        rank: i32,
        label: &'static str,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { group: "b", rank: 2, label: "first" },
            Row { group: "a", rank: 2, label: "second" },
            Row { group: "b", rank: 1, label: "third" },
            Row { group: "a", rank: 1, label: "fourth" },
        ]
    }

    fn labels(rows: Vec<Row>) -> Vec<&'static str> {
        rows.into_iter().map(|r| r.label).collect()
    }

    #[test]
    fn test_empty_query_is_identity() {
        let query = Query::<Row>::new();
        assert_eq!(query.apply(rows()).unwrap(), rows());
        assert!(query.is_tracking());
        assert!(!query.ignores_query_filters());
    }

    #[test]
    fn test_conditions_filter_serialized_rows() {
        let query = Query::new().filter(Criteria::from(FilterCondition::eq("group", "a")));
        assert_eq!(labels(query.apply(rows()).unwrap()), vec!["second", "fourth"]);
    }

    #[test]
    fn test_order_by_is_stable() {
        let query: Query<Row> = Query::new().order_by("group", OrderByDirection::Ascending).into();
        assert_eq!(
            labels(query.apply(rows()).unwrap()),
            vec!["second", "fourth", "first", "third"]
        );
    }

    #[test]
    fn test_then_by_breaks_ties_only() {
        let query: Query<Row> = Query::new()
            .order_by("group", OrderByDirection::Descending)
            .then_by("rank", OrderByDirection::Ascending)
            .into();
        assert_eq!(
            labels(query.apply(rows()).unwrap()),
            vec!["third", "first", "fourth", "second"]
        );
    }

    #[test]
    fn test_skip_and_take_run_in_recorded_order() {
        let query = Query::<Row>::new().skip(1).take(2);
        assert_eq!(labels(query.apply(rows()).unwrap()), vec!["second", "third"]);

        let past_end = Query::<Row>::new().skip(10);
        assert!(past_end.apply(rows()).unwrap().is_empty());
    }

    #[test]
    fn test_paging_before_ordering_sorts_only_the_page() {
        let query: Query<Row> = Query::new()
            .take(2)
            .order_by("rank", OrderByDirection::Ascending)
            .into();
        assert_eq!(labels(query.apply(rows()).unwrap()), vec!["first", "second"]);
    }

    #[test]
    fn test_structural_distinct() {
        let mut input = rows();
        input.push(input[0].clone());
        let query = Query::<Row>::new().distinct();
        assert_eq!(query.apply(input).unwrap().len(), 4);
    }

    #[test]
    fn test_distinct_with_comparer_keeps_first() {
        let query = Query::<Row>::new().distinct_by(comparer(|a: &Row, b: &Row| a.group == b.group));
        assert_eq!(labels(query.apply(rows()).unwrap()), vec!["first", "second"]);
    }

    #[test]
    fn test_includes_are_recorded() {
        let query = Query::<Row>::new().include("Parent.Children").include("Tags");
        let includes: Vec<String> = query.includes().map(ToString::to_string).collect();
        assert_eq!(includes, vec!["Parent.Children", "Tags"]);
    }
}
