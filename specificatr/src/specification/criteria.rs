use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::filter::{ConditionMatcher, FilterCondition};

/// Typed predicate over an entity
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Caller-supplied equality used by distinct queries
pub type DistinctComparer<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Filter criteria of a specification
///
/// Combines an optional typed predicate with any number of field conditions.
/// An entity matches when the predicate accepts it and every condition holds.
///
/// # Example
///
/// ```rust
/// use serde::Serialize;
/// use specificatr::{Criteria, FilterCondition};
///
/// #[derive(Serialize)]
/// struct User {
///     name: String,
///     age: u32,
/// }
///
/// let adults = Criteria::predicate(|u: &User| u.age >= 18)
///     .and(FilterCondition::like("name", "A%"));
///
/// let alice = User { name: "Alice".into(), age: 30 };
/// assert!(adults.matches(&alice).unwrap());
/// ```
pub struct Criteria<T> {
    predicate: Option<Predicate<T>>,
    conditions: Vec<FilterCondition>,
}

impl<T> Criteria<T> {
    /// Criteria that match every entity
    pub fn all() -> Self {
        Self {
            predicate: None,
            conditions: Vec::new(),
        }
    }

    pub fn predicate(predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Some(Arc::new(predicate)),
            conditions: Vec::new(),
        }
    }

    pub fn conditions(conditions: impl IntoIterator<Item = FilterCondition>) -> Self {
        Self {
            predicate: None,
            conditions: conditions.into_iter().collect(),
        }
    }

    /// Add a field condition
    #[must_use]
    pub fn and(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Replace the typed predicate
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn field_conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.predicate.is_none() && self.conditions.is_empty()
    }

    /// Whether evaluating these criteria needs the serialized entity
    pub(crate) fn needs_serialized(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// Prepare the criteria for evaluation against many entities
    pub(crate) fn matcher(&self) -> Result<CriteriaMatcher<'_, T>, regex::Error> {
        Ok(CriteriaMatcher {
            predicate: self.predicate.as_ref(),
            conditions: self
                .conditions
                .iter()
                .map(FilterCondition::matcher)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl<T: Serialize> Criteria<T> {
    /// Evaluate the criteria against one entity
    ///
    /// # Errors
    ///
    /// Fails when a `LIKE` pattern cannot be compiled, or when field
    /// conditions are present and the entity cannot be serialized.
    pub fn matches(&self, entity: &T) -> crate::Result<bool> {
        self.matcher()?.matches(entity)
    }
}

/// [`Criteria`] with every field condition compiled
pub(crate) struct CriteriaMatcher<'a, T> {
    predicate: Option<&'a Predicate<T>>,
    conditions: Vec<ConditionMatcher<'a>>,
}

impl<T> CriteriaMatcher<'_, T> {
    /// Evaluate against an entity whose serialized form is already known
    pub(crate) fn matches_serialized(&self, entity: &T, serialized: &Value) -> bool {
        self.predicate.map_or(true, |p| p(entity))
            && self.conditions.iter().all(|c| c.matches(serialized))
    }
}

impl<T: Serialize> CriteriaMatcher<'_, T> {
    pub(crate) fn matches(&self, entity: &T) -> crate::Result<bool> {
        if self.predicate.is_some_and(|p| !p(entity)) {
            return Ok(false);
        }
        if self.conditions.is_empty() {
            return Ok(true);
        }
        let serialized = serde_json::to_value(entity)?;
        Ok(self.conditions.iter().all(|c| c.matches(&serialized)))
    }
}

impl<T> Clone for Criteria<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            conditions: self.conditions.clone(),
        }
    }
}

impl<T> Default for Criteria<T> {
    fn default() -> Self {
        Self::all()
    }
}

impl<T> fmt::Debug for Criteria<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criteria")
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .field("conditions", &self.conditions)
            .finish()
    }
}

impl<T> From<FilterCondition> for Criteria<T> {
    fn from(condition: FilterCondition) -> Self {
        Self::conditions([condition])
    }
}

impl<T> From<Vec<FilterCondition>> for Criteria<T> {
    fn from(conditions: Vec<FilterCondition>) -> Self {
        Self::conditions(conditions)
    }
}
