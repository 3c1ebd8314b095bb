//! Include path resolution
//!
//! Flattens a navigation [`Selector`] into the dotted path handed to the
//! engine's eager-loading step:
//!
//! | selector | include path |
//! |----------|--------------|
//! | `x => x.Name` | `Name` |
//! | `x => x.NestedItem.NestedName` | `NestedItem.NestedName` |
//! | `x => x.NestedItems.Select(y => y.NestedName)` | `NestedItems.NestedName` |
//! | `x => x.NestedItems.Select(y => y.NestedNestedItems.Select(z => z.NestedNestedName))` | `NestedItems.NestedNestedItems.NestedNestedName` |

use crate::path::FieldPath;
use crate::selector::{collect_member_chain, Selector, SelectorError};

/// Resolves include selectors into dotted paths
pub struct IncludePathResolver;

impl IncludePathResolver {
    /// Resolve `selector` into an include path
    ///
    /// Every collection projection is unwrapped into its own level: the
    /// source of the projection is one level, the projected body becomes the
    /// next lambda. The member chain of each level is then collected root
    /// first and all levels are concatenated.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectorError`] for selectors that do not describe a
    /// navigation chain: the bare parameter, a projection applied to the
    /// parameter itself, a projection returning the bare element, or a type
    /// conversion anywhere in the chain.
    pub fn resolve(selector: &Selector) -> Result<FieldPath, SelectorError> {
        let mut path = FieldPath::default();
        let levels = Self::levels(selector);
        let last = levels.len() - 1;

        for (index, level) in levels.into_iter().enumerate() {
            let before = path.len();
            collect_member_chain(level, &mut path).map_err(|()| Self::chain_error(selector, level))?;

            if path.len() == before {
                return Err(match (index, last) {
                    (0, 0) => SelectorError::EmptySelector,
                    (i, l) if i < l => SelectorError::ProjectionOverParameter {
                        selector: selector.to_string(),
                    },
                    _ => SelectorError::ProjectionWithoutMember {
                        selector: selector.to_string(),
                    },
                });
            }
        }

        tracing::trace!(%selector, include = %path, "resolved include path");
        Ok(path)
    }

    /// Split a selector into one lambda body per projection level
    fn levels(selector: &Selector) -> Vec<&Selector> {
        let mut levels = Vec::new();
        let mut body = selector;
        while let Selector::Select { source, projection } = body {
            levels.push(source.as_ref());
            body = projection.as_ref();
        }
        levels.push(body);
        levels
    }

    fn chain_error(selector: &Selector, level: &Selector) -> SelectorError {
        if contains_conversion(level) {
            SelectorError::ConversionInInclude {
                selector: selector.to_string(),
            }
        } else {
            // A projection nested inside a member chain, e.g. x.A.Select(..).B
            SelectorError::NotAMemberPath {
                selector: selector.to_string(),
            }
        }
    }
}

fn contains_conversion(selector: &Selector) -> bool {
    match selector {
        Selector::Parameter => false,
        Selector::Convert { .. } => true,
        Selector::Member { source, .. } => contains_conversion(source),
        Selector::Select { source, projection } => {
            contains_conversion(source) || contains_conversion(projection)
        }
    }
}
