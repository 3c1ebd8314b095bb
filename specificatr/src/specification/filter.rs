//! Field conditions for specification criteria
//!
//! Besides typed predicates, a specification can filter with declarative
//! field conditions. Conditions are evaluated against the serialized entity,
//! so they work with any engine that can see entity fields.
//!
//! # Example
//!
//! ```rust
//! use specificatr::{FilterCondition, FilterOperator};
//!
//! let filters = vec![
//!     FilterCondition::eq("status", "active"),
//!     FilterCondition::gte("age", 18),
//!     FilterCondition::like("Parent.Name", "%smith%"),
//! ];
//! assert_eq!(filters[1].operator, FilterOperator::GreaterThanOrEqual);
//! ```

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::path::FieldPath;
use crate::value::compare_values;

/// Comparison operators for filter conditions
///
/// # Example
///
/// ```rust
/// use specificatr::FilterOperator;
///
/// assert_eq!(format!("{}", FilterOperator::Equal), "=");
/// assert_eq!(format!("{}", FilterOperator::Like), "LIKE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Pattern matching with `%` and `_` wildcards (LIKE)
    Like,
    /// Value is in a list (IN)
    In,
    /// Value is null or absent (IS NULL)
    IsNull,
    /// Value is present and not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A value used in filter conditions and raw query parameters
///
/// # Example
///
/// ```rust
/// use specificatr::FilterValue;
///
/// let string_val: FilterValue = "active".into();
/// let int_val: FilterValue = 42_i64.into();
/// let bool_val: FilterValue = true.into();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// List of string values (for IN operator)
    StringList(Vec<String>),
    /// List of integer values (for IN operator)
    IntegerList(Vec<i64>),
    /// Null value (for IS NULL / IS NOT NULL)
    Null,
}

impl FilterValue {
    /// Serialized form used when comparing against entity fields
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Float(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::Boolean(b) => Value::Bool(*b),
            Self::StringList(list) => list.iter().cloned().map(Value::String).collect(),
            Self::IntegerList(list) => list.iter().copied().map(Value::from).collect(),
            Self::Null => Value::Null,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        Self::StringList(list)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

/// A single condition on one (possibly nested) field
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field to filter on
    pub field: FieldPath,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<FieldPath>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter (field = value)
    pub fn eq(field: impl Into<FieldPath>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Create a not-equal filter (field != value)
    pub fn ne(field: impl Into<FieldPath>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// Create a greater-than filter (field > value)
    pub fn gt(field: impl Into<FieldPath>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// Create a greater-than-or-equal filter (field >= value)
    pub fn gte(field: impl Into<FieldPath>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// Create a less-than filter (field < value)
    pub fn lt(field: impl Into<FieldPath>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// Create a less-than-or-equal filter (field <= value)
    pub fn lte(field: impl Into<FieldPath>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Create a pattern filter (field LIKE pattern)
    pub fn like(field: impl Into<FieldPath>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Like, FilterValue::String(pattern.into()))
    }

    /// Create an IN filter over strings
    pub fn in_strings(field: impl Into<FieldPath>, values: Vec<String>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::StringList(values))
    }

    /// Create an IN filter over integers
    pub fn in_integers(field: impl Into<FieldPath>, values: Vec<i64>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::IntegerList(values))
    }

    /// Create an IS NULL filter
    pub fn is_null(field: impl Into<FieldPath>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::Null)
    }

    /// Create an IS NOT NULL filter
    pub fn is_not_null(field: impl Into<FieldPath>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FilterValue::Null)
    }

    /// Evaluate the condition against a serialized entity
    ///
    /// A missing field counts as null. Comparisons against null never match,
    /// except for `IS NULL`. To evaluate one condition against many rows, use
    /// [`matcher`](Self::matcher) so a `LIKE` pattern is compiled once.
    ///
    /// # Errors
    ///
    /// Fails when a `LIKE` pattern cannot be compiled.
    pub fn matches(&self, entity: &Value) -> Result<bool, regex::Error> {
        Ok(self.matcher()?.matches(entity))
    }

    /// Prepare the condition for evaluation against many rows
    ///
    /// # Errors
    ///
    /// Fails when a `LIKE` pattern cannot be compiled.
    pub fn matcher(&self) -> Result<ConditionMatcher<'_>, regex::Error> {
        let pattern = match (self.operator, &self.value) {
            (FilterOperator::Like, FilterValue::String(pattern)) => Some(like_regex(pattern)?),
            _ => None,
        };
        Ok(ConditionMatcher {
            condition: self,
            pattern,
        })
    }

    fn compare_same_kind(&self, field: &Value) -> Option<Ordering> {
        let value = self.value.to_json();
        let same_kind = matches!(
            (field, &value),
            (Value::Number(_), Value::Number(_))
                | (Value::String(_), Value::String(_))
                | (Value::Bool(_), Value::Bool(_))
        );
        same_kind.then(|| compare_values(field, &value))
    }
}

/// A [`FilterCondition`] with its `LIKE` pattern compiled
#[derive(Debug, Clone)]
pub struct ConditionMatcher<'a> {
    condition: &'a FilterCondition,
    pattern: Option<Regex>,
}

impl ConditionMatcher<'_> {
    pub fn matches(&self, entity: &Value) -> bool {
        let condition = self.condition;
        let field = condition.field.lookup(entity).unwrap_or(&Value::Null);

        match condition.operator {
            FilterOperator::IsNull => field.is_null(),
            FilterOperator::IsNotNull => !field.is_null(),
            _ if field.is_null() => false,
            FilterOperator::Equal => compare_values(field, &condition.value.to_json()).is_eq(),
            FilterOperator::NotEqual => compare_values(field, &condition.value.to_json()).is_ne(),
            FilterOperator::GreaterThan => {
                condition.compare_same_kind(field) == Some(Ordering::Greater)
            }
            FilterOperator::GreaterThanOrEqual => matches!(
                condition.compare_same_kind(field),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::LessThan => condition.compare_same_kind(field) == Some(Ordering::Less),
            FilterOperator::LessThanOrEqual => matches!(
                condition.compare_same_kind(field),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::Like => match (field, &self.pattern) {
                (Value::String(text), Some(pattern)) => pattern.is_match(text),
                _ => false,
            },
            FilterOperator::In => match condition.value.to_json() {
                Value::Array(candidates) => candidates
                    .iter()
                    .any(|candidate| compare_values(field, candidate).is_eq()),
                _ => false,
            },
        }
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            FilterOperator::IsNull | FilterOperator::IsNotNull => {
                write!(f, "{} {}", self.field, self.operator)
            }
            _ => write!(f, "{} {} {}", self.field, self.operator, self.value.to_json()),
        }
    }
}

/// SQL LIKE semantics: `%` matches any run of characters, `_` exactly one
fn like_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::from("^(?s)");
    for ch in pattern.chars() {
        match ch {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> Value {
        json!({
            "name": "Alice Smith",
            "age": 34,
            "score": 7.5,
            "active": true,
            "deleted_at": null,
            "team": { "name": "core" }
        })
    }

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(format!("{}", FilterOperator::Equal), "=");
        assert_eq!(format!("{}", FilterOperator::NotEqual), "!=");
        assert_eq!(format!("{}", FilterOperator::GreaterThanOrEqual), ">=");
        assert_eq!(format!("{}", FilterOperator::Like), "LIKE");
        assert_eq!(format!("{}", FilterOperator::In), "IN");
        assert_eq!(format!("{}", FilterOperator::IsNotNull), "IS NOT NULL");
    }

    #[test]
    fn test_filter_value_from_i32() {
        let value: FilterValue = 42_i32.into();
        assert_eq!(value, FilterValue::Integer(42));
    }

    #[test]
    fn test_filter_value_to_json() {
        assert_eq!(FilterValue::from("a").to_json(), json!("a"));
        assert_eq!(FilterValue::from(vec![1_i64, 2]).to_json(), json!([1, 2]));
        assert_eq!(FilterValue::Float(f64::NAN).to_json(), Value::Null);
    }

    #[test]
    fn test_filter_condition_nested_field() {
        let filter = FilterCondition::eq("team.name", "core");
        assert_eq!(filter.field.to_string(), "team.name");
        assert!(filter.matches(&user()).unwrap());
    }

    #[test]
    fn test_equality_and_inequality() {
        assert!(FilterCondition::eq("age", 34).matches(&user()).unwrap());
        assert!(!FilterCondition::eq("age", 35).matches(&user()).unwrap());
        assert!(FilterCondition::ne("name", "Bob").matches(&user()).unwrap());
        assert!(FilterCondition::eq("active", true).matches(&user()).unwrap());
    }

    #[test]
    fn test_range_comparisons() {
        assert!(FilterCondition::gt("age", 18).matches(&user()).unwrap());
        assert!(FilterCondition::gte("age", 34).matches(&user()).unwrap());
        assert!(FilterCondition::lt("score", 8.0).matches(&user()).unwrap());
        assert!(!FilterCondition::lte("score", 7.0).matches(&user()).unwrap());
        // numbers never compare with strings
        assert!(!FilterCondition::gt("age", "10").matches(&user()).unwrap());
    }

    #[test]
    fn test_like_wildcards() {
        assert!(FilterCondition::like("name", "%Smith").matches(&user()).unwrap());
        assert!(FilterCondition::like("name", "Alic_ %").matches(&user()).unwrap());
        assert!(!FilterCondition::like("name", "Smith%").matches(&user()).unwrap());
        assert!(!FilterCondition::like("age", "3%").matches(&user()).unwrap());
    }

    #[test]
    fn test_like_escapes_regex_metacharacters() {
        let entity = json!({ "email": "a.b+c@example.com" });
        assert!(FilterCondition::like("email", "a.b+c@%").matches(&entity).unwrap());
        assert!(!FilterCondition::like("email", "a.b+d@%").matches(&entity).unwrap());
    }

    #[test]
    fn test_in_lists() {
        assert!(FilterCondition::in_integers("age", vec![1, 34]).matches(&user()).unwrap());
        assert!(
            !FilterCondition::in_strings("name", vec!["Bob".to_string()]).matches(&user()).unwrap()
        );
    }

    #[test]
    fn test_null_checks() {
        assert!(FilterCondition::is_null("deleted_at").matches(&user()).unwrap());
        assert!(FilterCondition::is_null("missing").matches(&user()).unwrap());
        assert!(FilterCondition::is_not_null("name").matches(&user()).unwrap());
        // comparisons against null never match
        assert!(!FilterCondition::ne("deleted_at", "x").matches(&user()).unwrap());
    }

    #[test]
    fn test_matcher_reuses_compiled_pattern() {
        let condition = FilterCondition::like("name", "A%");
        let matcher = condition.matcher().unwrap();
        assert!(matcher.matches(&json!({ "name": "Ada" })));
        assert!(matcher.matches(&json!({ "name": "Alan" })));
        assert!(!matcher.matches(&json!({ "name": "Grace" })));
    }

    #[test]
    fn test_oversized_like_pattern_is_an_error() {
        let pattern = "_".repeat(1_000_000);
        let condition = FilterCondition::like("name", pattern);
        assert!(condition.matcher().is_err());
        assert!(condition.matches(&user()).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(FilterCondition::gte("age", 18).to_string(), "age >= 18");
        assert_eq!(
            FilterCondition::is_null("deleted_at").to_string(),
            "deleted_at IS NULL"
        );
    }
}
