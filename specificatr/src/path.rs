//! Dotted field paths
//!
//! A [`FieldPath`] is the resolved form of a [`Selector`](crate::selector::Selector):
//! an ordered list of property names. Include paths, order-by keys and field
//! conditions all operate on field paths.

use std::fmt;

use serde_json::Value;

/// Ordered list of property names, rendered joined by `.`
///
/// # Example
///
/// ```rust
/// use specificatr::FieldPath;
///
/// let path = FieldPath::parse("Children.GrandChildren.Name");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.to_string(), "Children.GrandChildren.Name");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Create a path from its segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a dotted path, ignoring empty segments
    pub fn parse(dotted: &str) -> Self {
        Self::new(dotted.split('.').filter(|s| !s.is_empty()))
    }

    /// Append one segment
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// Path segments in root-to-leaf order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The root segment, if any
    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Walk a serialized entity along this path
    ///
    /// Returns `None` as soon as a segment is missing or the current value is
    /// not an object.
    pub fn lookup<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| current.as_object()?.get(segment))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

impl From<String> for FieldPath {
    fn from(dotted: String) -> Self {
        Self::parse(&dotted)
    }
}
