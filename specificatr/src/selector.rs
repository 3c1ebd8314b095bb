//! Property selectors
//!
//! Selectors describe "which property" without runtime reflection: they are
//! small expression trees built at the call site and later resolved into
//! [`FieldPath`]s. The same type serves include paths, order-by keys and the
//! property list of a partial update.
//!
//! # Example
//!
//! ```rust
//! use specificatr::Selector;
//!
//! // x => x.Parent.GrandParent
//! let one_to_one = Selector::path("Parent.GrandParent");
//!
//! // x => x.Children.Select(y => y.GrandChildren)
//! let one_to_many = Selector::field("Children").select(|child| child.member("GrandChildren"));
//!
//! assert_eq!(one_to_one.to_string(), "x => x.Parent.GrandParent");
//! assert_eq!(
//!     one_to_many.to_string(),
//!     "x => x.Children.Select(y => y.GrandChildren)"
//! );
//! ```

use std::fmt;

use thiserror::Error;

use crate::path::FieldPath;

/// Expression tree over an entity parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// The lambda parameter itself
    Parameter,
    /// Property access on `source`
    Member { source: Box<Selector>, name: String },
    /// Projection over the collection produced by `source`
    ///
    /// `projection` is a new lambda body whose [`Selector::Parameter`] is an
    /// element of the collection.
    Select {
        source: Box<Selector>,
        projection: Box<Selector>,
    },
    /// Type conversion wrapping `operand`, e.g. boxing a value-typed property
    Convert { operand: Box<Selector>, target: String },
}

impl Selector {
    /// The bare parameter `x => x`
    pub fn parameter() -> Self {
        Selector::Parameter
    }

    /// Direct property access `x => x.name`
    pub fn field(name: impl Into<String>) -> Self {
        Selector::Parameter.member(name)
    }

    /// Member chain parsed from a dotted path, `x => x.a.b.c`
    pub fn path(dotted: &str) -> Self {
        dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .fold(Selector::Parameter, Selector::member)
    }

    /// Access `name` on the current expression
    #[must_use]
    pub fn member(self, name: impl Into<String>) -> Self {
        Selector::Member {
            source: Box::new(self),
            name: name.into(),
        }
    }

    /// Project every element of the current collection expression
    ///
    /// The closure receives a fresh parameter standing for one element.
    #[must_use]
    pub fn select(self, projection: impl FnOnce(Selector) -> Selector) -> Self {
        Selector::Select {
            source: Box::new(self),
            projection: Box::new(projection(Selector::Parameter)),
        }
    }

    /// Wrap the current expression in a type conversion
    #[must_use]
    pub fn convert(self, target: impl Into<String>) -> Self {
        Selector::Convert {
            operand: Box::new(self),
            target: target.into(),
        }
    }

    /// Resolve a plain member chain, optionally wrapped in one conversion
    ///
    /// Used for order-by keys and field conditions, which cannot traverse a
    /// collection projection.
    pub fn member_path(&self) -> Result<FieldPath, SelectorError> {
        let body = match self {
            Selector::Convert { operand, .. } => operand.as_ref(),
            other => other,
        };
        let mut path = FieldPath::default();
        collect_member_chain(body, &mut path).map_err(|_| SelectorError::NotAMemberPath {
            selector: self.to_string(),
        })?;
        if path.is_empty() {
            return Err(SelectorError::EmptySelector);
        }
        Ok(path)
    }

    /// Name of the scalar property targeted by a partial update
    ///
    /// Only `x => x.prop` and `x => (T)x.prop` are accepted.
    pub fn scalar_property(&self) -> Result<&str, SelectorError> {
        let body = match self {
            Selector::Convert { operand, .. } => operand.as_ref(),
            other => other,
        };
        match body {
            Selector::Member { source, name } if matches!(**source, Selector::Parameter) => {
                Ok(name)
            }
            _ => Err(SelectorError::UnsupportedUpdateSelector {
                selector: self.to_string(),
            }),
        }
    }

    fn render(&self, depth: usize, out: &mut String) {
        match self {
            Selector::Parameter => out.push_str(&parameter_name(depth)),
            Selector::Member { source, name } => {
                source.render(depth, out);
                out.push('.');
                out.push_str(name);
            }
            Selector::Select { source, projection } => {
                source.render(depth, out);
                let inner = parameter_name(depth + 1);
                out.push_str(".Select(");
                out.push_str(&inner);
                out.push_str(" => ");
                projection.render(depth + 1, out);
                out.push(')');
            }
            Selector::Convert { operand, target } => {
                out.push('(');
                out.push_str(target);
                out.push(')');
                operand.render(depth, out);
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut body = String::new();
        self.render(0, &mut body);
        write!(f, "{} => {}", parameter_name(0), body)
    }
}

fn parameter_name(depth: usize) -> String {
    const NAMES: [&str; 3] = ["x", "y", "z"];
    NAMES
        .get(depth)
        .map_or_else(|| format!("p{depth}"), |name| (*name).to_string())
}

/// Append the names of a member chain, root first
///
/// Fails on anything that is not `Parameter` or `Member`; the caller decides
/// which error to report.
pub(crate) fn collect_member_chain(selector: &Selector, path: &mut FieldPath) -> Result<(), ()> {
    match selector {
        Selector::Parameter => Ok(()),
        Selector::Member { source, name } => {
            collect_member_chain(source, path)?;
            path.push(name.clone());
            Ok(())
        }
        Selector::Select { .. } | Selector::Convert { .. } => Err(()),
    }
}

/// Reasons a selector cannot be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// The selector is the bare parameter
    #[error("selector does not access any member")]
    EmptySelector,

    /// `x => x.Select(...)`: the entity itself is not a collection
    #[error("collection projection in `{selector}` must be applied to a member, not to the parameter itself")]
    ProjectionOverParameter { selector: String },

    /// `x => x.Items.Select(y => y)`
    #[error("collection projection in `{selector}` must access a member of the projected element")]
    ProjectionWithoutMember { selector: String },

    /// Include paths are pure navigation chains
    #[error("type conversion in `{selector}` is not valid in an include path")]
    ConversionInInclude { selector: String },

    /// Order-by keys and conditions need a plain member chain
    #[error("`{selector}` is not a plain member path")]
    NotAMemberPath { selector: String },

    /// Partial updates target direct scalar properties only
    #[error("`{selector}` is neither a member access nor a converted member access")]
    UnsupportedUpdateSelector { selector: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_builds_member_chain() {
        let selector = Selector::path("Parent.GrandParent");
        assert_eq!(
            selector,
            Selector::Parameter.member("Parent").member("GrandParent")
        );
    }

    #[test]
    fn test_display_renders_lambda() {
        let selector = Selector::field("NestedItems")
            .select(|y| y.member("NestedNestedItems").select(|z| z.member("NestedNestedName")));
        assert_eq!(
            selector.to_string(),
            "x => x.NestedItems.Select(y => y.NestedNestedItems.Select(z => z.NestedNestedName))"
        );
        assert_eq!(
            Selector::field("Number").convert("object").to_string(),
            "x => (object)x.Number"
        );
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(Selector::field("Name"), Selector::path("Name"));
        assert_ne!(Selector::field("Name"), Selector::field("Number"));
    }

    #[test]
    fn test_member_path_accepts_conversion() {
        let path = Selector::path("Parent.Number").convert("object").member_path().unwrap();
        assert_eq!(path.to_string(), "Parent.Number");
    }

    #[test]
    fn test_member_path_rejects_projection() {
        let err = Selector::field("Children")
            .select(|c| c.member("Name"))
            .member_path()
            .unwrap_err();
        assert!(matches!(err, SelectorError::NotAMemberPath { .. }));
    }

    #[test]
    fn test_member_path_rejects_parameter() {
        assert_eq!(
            Selector::parameter().member_path(),
            Err(SelectorError::EmptySelector)
        );
    }

    #[test]
    fn test_scalar_property() {
        assert_eq!(Selector::field("Name").scalar_property(), Ok("Name"));
        assert_eq!(
            Selector::field("Number").convert("object").scalar_property(),
            Ok("Number")
        );
    }

    #[test]
    fn test_scalar_property_rejects_other_shapes() {
        for selector in [
            Selector::parameter(),
            Selector::path("Parent.Name"),
            Selector::field("Children").select(|c| c.member("Name")),
            Selector::parameter().convert("object"),
        ] {
            assert!(matches!(
                selector.scalar_property(),
                Err(SelectorError::UnsupportedUpdateSelector { .. })
            ));
        }
    }
}
