//! Entity contract
//!
//! Repositories and engines are generic over [`Entity`]: a serializable value
//! with a key, living in a named entity set.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key type of an entity
///
/// Implemented for every type that can be compared, hashed, printed and
/// serialized, such as integers, strings and UUIDs.
pub trait EntityId:
    Serialize + Clone + Eq + Hash + Debug + Display + Send + Sync + 'static
{
}

impl<I> EntityId for I where
    I: Serialize + Clone + Eq + Hash + Debug + Display + Send + Sync + 'static
{
}

/// A persistent entity
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use specificatr::Entity;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Customer {
///     id: u64,
///     name: String,
///     orders: Vec<u64>,
/// }
///
/// impl Entity for Customer {
///     type Id = u64;
///     const SET_NAME: &'static str = "customers";
///
///     fn id(&self) -> &u64 {
///         &self.id
///     }
///
///     fn navigations() -> &'static [&'static str] {
///         &["orders"]
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Id: EntityId;

    /// Name of the entity set rows of this type are stored in
    const SET_NAME: &'static str;

    fn id(&self) -> &Self::Id;

    /// Names of the navigation properties that may start an include path
    fn navigations() -> &'static [&'static str] {
        &[]
    }
}
