//! Specification evaluation
//!
//! [`SpecificationEvaluator`] turns a base [`Query`] and a [`Specification`]
//! into the configured query. Concerns are applied in a fixed order:
//!
//! 1. criteria
//! 2. includes, each resolved to a dotted path
//! 3. (count variant only) snapshot for the total count
//! 4. paging
//! 5. ordering: primary key, then every further key as a then-by
//! 6. default query filter bypass
//! 7. tracking
//! 8. distinct
//!
//! Paging is recorded before ordering, so the in-memory engine sorts only
//! the selected page. Callers who want "sort, then page" semantics must
//! already receive rows in the desired order.

use tracing::debug;

use crate::error::Result;
use crate::path::FieldPath;
use crate::query::Query;
use crate::resolver::IncludePathResolver;
use crate::specification::{OrderByExpression, Specification};

/// A configured query plus the query that counts all matching rows
#[derive(Debug, Clone)]
pub struct CountedQuery<T> {
    /// Query producing the requested page
    pub query: Query<T>,
    /// Query over every row the criteria match, before paging
    pub count_query: Query<T>,
}

/// Applies specifications to queries
pub struct SpecificationEvaluator;

impl SpecificationEvaluator {
    /// Apply `spec` to `input`
    ///
    /// # Errors
    ///
    /// Returns a selector error when an include or order-by selector cannot
    /// be resolved.
    ///
    /// # Example
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use specificatr::{Query, Specification, SpecificationEvaluator};
    ///
    /// #[derive(Clone, Serialize)]
    /// struct Row {
    ///     n: i32,
    /// }
    ///
    /// let spec = Specification::<Row>::builder().filter(|r| r.n > 1).build();
    /// let query = SpecificationEvaluator::get_query(Query::new(), spec).unwrap();
    ///
    /// let rows = vec![Row { n: 1 }, Row { n: 2 }];
    /// assert_eq!(query.apply(rows).unwrap().len(), 1);
    /// ```
    pub fn get_query<T>(input: Query<T>, spec: Specification<T>) -> Result<Query<T>> {
        let (query, _) = Self::evaluate(input, spec, false)?;
        Ok(query)
    }

    /// Apply `spec` to `input`, also returning the pre-paging count query
    ///
    /// # Errors
    ///
    /// Same as [`get_query`](Self::get_query).
    pub fn get_query_with_count<T>(input: Query<T>, spec: Specification<T>) -> Result<CountedQuery<T>> {
        let (query, count_query) = Self::evaluate(input, spec, true)?;
        Ok(CountedQuery {
            count_query: count_query.unwrap_or_else(|| query.clone()),
            query,
        })
    }

    fn evaluate<T>(
        input: Query<T>,
        spec: Specification<T>,
        with_count: bool,
    ) -> Result<(Query<T>, Option<Query<T>>)> {
        let query = Self::set_criteria(input, &spec);
        let query = Self::set_includes(query, &spec)?;

        let count_query = with_count.then(|| {
            let snapshot = query.clone().as_no_tracking();
            if spec.ignore_query_filters() {
                snapshot.ignore_query_filters()
            } else {
                snapshot
            }
        });

        let query = Self::set_paging(query, &spec);
        let query = Self::set_ordering(query, &spec)?;
        let query = Self::set_ignore_query_filters(query, &spec);
        let query = Self::set_tracking(query, &spec);
        let query = Self::set_distinct(query, &spec);

        Ok((query, count_query))
    }

    fn set_criteria<T>(query: Query<T>, spec: &Specification<T>) -> Query<T> {
        match spec.criteria() {
            Some(criteria) if !criteria.is_empty() => {
                debug!(
                    conditions = criteria.field_conditions().len(),
                    predicate = criteria.has_predicate(),
                    "applying criteria"
                );
                query.filter(criteria.clone())
            }
            _ => query,
        }
    }

    fn set_includes<T>(query: Query<T>, spec: &Specification<T>) -> Result<Query<T>> {
        spec.includes().iter().try_fold(query, |query, selector| {
            let path = IncludePathResolver::resolve(selector).inspect_err(|err| {
                tracing::warn!(%selector, error = %err, "rejected include selector");
            })?;
            debug!(include = %path, "applying include");
            Ok(query.include(path))
        })
    }

    fn set_paging<T>(query: Query<T>, spec: &Specification<T>) -> Query<T> {
        match spec.paging() {
            Some(paging) => {
                debug!(
                    page_index = paging.page_index,
                    page_size = paging.page_size,
                    "applying paging"
                );
                query.skip(paging.skip()).take(paging.take())
            }
            None => query,
        }
    }

    fn set_ordering<T>(query: Query<T>, spec: &Specification<T>) -> Result<Query<T>> {
        let Some((primary, rest)) = spec.order_by().split_first() else {
            return Ok(query);
        };

        let key = Self::order_key(primary)?;
        debug!(key = %key, direction = %primary.direction, "applying order by");
        let mut ordered = query.order_by(key, primary.direction);

        for expression in rest {
            let key = Self::order_key(expression)?;
            debug!(key = %key, direction = %expression.direction, "applying then by");
            ordered = ordered.then_by(key, expression.direction);
        }

        Ok(ordered.into_query())
    }

    fn order_key(expression: &OrderByExpression) -> Result<FieldPath> {
        let key = expression.selector.member_path().inspect_err(|err| {
            tracing::warn!(selector = %expression.selector, error = %err, "rejected order by selector");
        })?;
        Ok(key)
    }

    fn set_ignore_query_filters<T>(query: Query<T>, spec: &Specification<T>) -> Query<T> {
        if spec.ignore_query_filters() {
            debug!("ignoring query filters");
            query.ignore_query_filters()
        } else {
            query
        }
    }

    fn set_tracking<T>(query: Query<T>, spec: &Specification<T>) -> Query<T> {
        if spec.as_tracking() {
            query.as_tracking()
        } else {
            query.as_no_tracking()
        }
    }

    fn set_distinct<T>(query: Query<T>, spec: &Specification<T>) -> Query<T> {
        if !spec.is_distinct() {
            return query;
        }
        match spec.distinct_comparer() {
            Some(comparer) => {
                debug!("applying distinct with comparer");
                query.distinct_by(comparer.clone())
            }
            None => {
                debug!("applying distinct");
                query.distinct()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::query::QueryStep;
    use crate::selector::{Selector, SelectorError};
    use crate::specification::{FilterCondition, OrderByDirection};
    use serde::Serialize;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct TestEntity {
        number: i32,
        name: String,
    }

    fn entity(number: i32, name: &str) -> TestEntity {
        TestEntity {
            number,
            name: name.to_string(),
        }
    }

    fn entities() -> Vec<TestEntity> {
        vec![
            entity(1, "Name1"),
            entity(2, "Name2"),
            entity(3, "Name3"),
            entity(4, "Name4"),
        ]
    }

    fn run(spec: Specification<TestEntity>, rows: Vec<TestEntity>) -> Vec<TestEntity> {
        SpecificationEvaluator::get_query(Query::new(), spec)
            .unwrap()
            .apply(rows)
            .unwrap()
    }

    #[test]
    fn test_empty_specification_returns_all_rows_in_source_order() {
        assert_eq!(run(Specification::all(), entities()), entities());
    }

    #[test]
    fn test_criteria_returns_only_matching_rows() {
        let spec = Specification::builder().filter(|e: &TestEntity| e.number == 3).build();
        assert_eq!(run(spec, entities()), vec![entity(3, "Name3")]);
    }

    #[test]
    fn test_field_conditions() {
        let spec = Specification::builder()
            .condition(FilterCondition::gte("number", 2))
            .condition(FilterCondition::ne("name", "Name3"))
            .build();
        assert_eq!(
            run(spec, entities()),
            vec![entity(2, "Name2"), entity(4, "Name4")]
        );
    }

    #[test]
    fn test_paging_returns_first_page() {
        let spec = Specification::builder().paging(1, 2).build();
        assert_eq!(
            run(spec, entities()),
            vec![entity(1, "Name1"), entity(2, "Name2")]
        );
    }

    #[test]
    fn test_paging_returns_second_page() {
        let spec = Specification::builder().paging(2, 3).build();
        assert_eq!(run(spec, entities()), vec![entity(4, "Name4")]);
    }

    #[test]
    fn test_primary_and_secondary_ordering() {
        let rows = vec![
            entity(2, "b"),
            entity(1, "b"),
            entity(3, "a"),
            entity(1, "a"),
        ];
        let spec = Specification::builder()
            .order_by(Selector::field("name"), OrderByDirection::Descending)
            .then_by(Selector::field("number"), OrderByDirection::Ascending)
            .build();
        assert_eq!(
            run(spec, rows),
            vec![entity(1, "b"), entity(2, "b"), entity(1, "a"), entity(3, "a")]
        );
    }

    #[test]
    fn test_ordering_with_conversion_selector() {
        let spec = Specification::builder()
            .order_by(Selector::field("number").convert("object"), OrderByDirection::Descending)
            .build();
        let numbers: Vec<i32> = run(spec, entities()).into_iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_primary_ordering_is_recorded_once() {
        let spec = Specification::<TestEntity>::builder()
            .order_by(Selector::field("name"), OrderByDirection::Ascending)
            .then_by(Selector::field("number"), OrderByDirection::Ascending)
            .build();
        let query = SpecificationEvaluator::get_query(Query::new(), spec).unwrap();
        let order_steps = query
            .steps()
            .iter()
            .filter(|step| matches!(step, QueryStep::OrderBy { .. }))
            .count();
        let then_steps = query
            .steps()
            .iter()
            .filter(|step| matches!(step, QueryStep::ThenBy { .. }))
            .count();
        assert_eq!((order_steps, then_steps), (1, 1));
    }

    #[test]
    fn test_steps_follow_fixed_order() {
        let spec = Specification::<TestEntity>::builder()
            .distinct()
            .order_by(Selector::field("name"), OrderByDirection::Ascending)
            .paging(1, 10)
            .include(Selector::field("Children").select(|c| c.member("Toys")))
            .filter(|e| e.number > 0)
            .build();
        let query = SpecificationEvaluator::get_query(Query::new(), spec).unwrap();
        let kinds: Vec<&str> = query
            .steps()
            .iter()
            .map(|step| match step {
                QueryStep::Filter(_) => "filter",
                QueryStep::Include(_) => "include",
                QueryStep::Skip(_) => "skip",
                QueryStep::Take(_) => "take",
                QueryStep::OrderBy { .. } => "order_by",
                QueryStep::ThenBy { .. } => "then_by",
                QueryStep::Distinct(_) => "distinct",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["filter", "include", "skip", "take", "order_by", "distinct"]
        );
        let includes: Vec<String> = query.includes().map(ToString::to_string).collect();
        assert_eq!(includes, vec!["Children.Toys"]);
    }

    #[test]
    fn test_tracking_and_filter_flags() {
        let query =
            SpecificationEvaluator::get_query(Query::<TestEntity>::new(), Specification::all())
                .unwrap();
        assert!(!query.is_tracking());
        assert!(!query.ignores_query_filters());

        let spec = Specification::<TestEntity>::builder()
            .as_tracking()
            .ignore_query_filters()
            .build();
        let query = SpecificationEvaluator::get_query(Query::new(), spec).unwrap();
        assert!(query.is_tracking());
        assert!(query.ignores_query_filters());
    }

    #[test]
    fn test_distinct_without_comparer() {
        let mut rows = entities();
        rows.push(entity(1, "Name1"));
        let spec = Specification::builder().distinct().build();
        assert_eq!(run(spec, rows), entities());
    }

    #[test]
    fn test_distinct_with_comparer() {
        let rows = vec![entity(1, "a"), entity(2, "A"), entity(3, "b")];
        let spec = Specification::builder()
            .distinct_by(|a: &TestEntity, b: &TestEntity| a.name.eq_ignore_ascii_case(&b.name))
            .build();
        assert_eq!(run(spec, rows), vec![entity(1, "a"), entity(3, "b")]);
    }

    #[test]
    fn test_count_query_is_taken_before_paging() {
        let spec = Specification::builder()
            .filter(|e: &TestEntity| e.number > 1)
            .paging(1, 2)
            .build();
        let counted = SpecificationEvaluator::get_query_with_count(Query::new(), spec).unwrap();

        assert_eq!(counted.query.apply(entities()).unwrap().len(), 2);
        assert_eq!(counted.count_query.apply(entities()).unwrap().len(), 3);
        assert!(!counted.count_query.is_tracking());
    }

    #[test]
    fn test_invalid_include_fails_fast() {
        let spec = Specification::<TestEntity>::builder()
            .include(Selector::parameter())
            .build();
        let err = SpecificationEvaluator::get_query(Query::new(), spec).unwrap_err();
        assert!(matches!(err, Error::Selector(SelectorError::EmptySelector)));
    }

    #[test]
    fn test_projection_in_order_by_is_rejected() {
        let spec = Specification::<TestEntity>::builder()
            .order_by(
                Selector::field("Children").select(|c| c.member("Name")),
                OrderByDirection::Ascending,
            )
            .build();
        let err = SpecificationEvaluator::get_query(Query::new(), spec).unwrap_err();
        assert!(matches!(
            err,
            Error::Selector(SelectorError::NotAMemberPath { .. })
        ));
    }
}
