use std::fmt;

use crate::selector::Selector;

/// Sort direction of an order-by entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderByDirection {
    /// Ascending order (A-Z, 0-9, oldest first)
    #[default]
    Ascending,
    /// Descending order (Z-A, 9-0, newest first)
    Descending,
}

impl fmt::Display for OrderByDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// One ordering key of a specification
///
/// Two expressions are equal when both the selector tree and the direction
/// are equal, which is what specifications use to drop duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderByExpression {
    pub selector: Selector,
    pub direction: OrderByDirection,
}

impl OrderByExpression {
    pub fn new(selector: Selector, direction: OrderByDirection) -> Self {
        Self {
            selector,
            direction,
        }
    }

    pub fn ascending(selector: Selector) -> Self {
        Self::new(selector, OrderByDirection::Ascending)
    }

    pub fn descending(selector: Selector) -> Self {
        Self::new(selector, OrderByDirection::Descending)
    }
}

impl fmt::Display for OrderByExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.selector, self.direction)
    }
}
