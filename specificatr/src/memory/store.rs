//! Row storage for the in-memory context

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde_json::Value;

use crate::engine::EngineError;

/// One staged write, borrowed from the change tracker
#[derive(Debug)]
pub(crate) enum Change<'a> {
    Insert {
        set: &'a str,
        key: &'a str,
        value: &'a Value,
    },
    Replace {
        set: &'a str,
        key: &'a str,
        value: &'a Value,
    },
    Merge {
        set: &'a str,
        key: &'a str,
        value: &'a Value,
        properties: &'a BTreeSet<String>,
    },
    Delete {
        set: &'a str,
        key: &'a str,
    },
}

/// Serialized rows per entity set, keyed by row key in insertion order
#[derive(Debug, Default)]
pub(crate) struct Store {
    sets: HashMap<String, IndexMap<String, Value>>,
}

impl Store {
    pub(crate) fn rows(&self, set: &str) -> impl Iterator<Item = &Value> {
        self.sets.get(set).into_iter().flat_map(IndexMap::values)
    }

    pub(crate) fn get(&self, set: &str, key: &str) -> Option<&Value> {
        self.sets.get(set)?.get(key)
    }

    pub(crate) fn contains(&self, set: &str, key: &str) -> bool {
        self.get(set, key).is_some()
    }

    pub(crate) fn len(&self, set: &str) -> usize {
        self.sets.get(set).map_or(0, IndexMap::len)
    }

    /// Apply a batch of changes, all or nothing
    ///
    /// Inserts require an unused key and updates an existing row. Deleting a
    /// row that is not stored is skipped and not counted.
    pub(crate) fn apply(&mut self, changes: &[Change<'_>]) -> Result<usize, EngineError> {
        for change in changes {
            match change {
                Change::Insert { set, key, .. } if self.contains(set, key) => {
                    return Err(EngineError::DuplicateKey {
                        entity_set: set.to_string(),
                        key: key.to_string(),
                    });
                }
                Change::Replace { set, key, .. } | Change::Merge { set, key, .. }
                    if !self.contains(set, key) =>
                {
                    return Err(EngineError::MissingRow {
                        entity_set: set.to_string(),
                        key: key.to_string(),
                    });
                }
                _ => {}
            }
        }

        let mut affected = 0;
        for change in changes {
            match change {
                Change::Insert { set, key, value } => {
                    self.sets
                        .entry(set.to_string())
                        .or_default()
                        .insert(key.to_string(), (*value).clone());
                    affected += 1;
                }
                Change::Replace { set, key, value } => {
                    if let Some(row) = self.row_mut(set, key) {
                        *row = (*value).clone();
                        affected += 1;
                    }
                }
                Change::Merge {
                    set,
                    key,
                    value,
                    properties,
                } => {
                    if let Some(Value::Object(row)) = self.row_mut(set, key) {
                        for property in properties.iter() {
                            let updated = value.get(property).cloned().unwrap_or(Value::Null);
                            row.insert(property.clone(), updated);
                        }
                        affected += 1;
                    }
                }
                Change::Delete { set, key } => {
                    let removed = self
                        .sets
                        .get_mut(*set)
                        .and_then(|rows| rows.shift_remove(*key));
                    if removed.is_some() {
                        affected += 1;
                    }
                }
            }
        }
        Ok(affected)
    }

    fn row_mut(&mut self, set: &str, key: &str) -> Option<&mut Value> {
        self.sets.get_mut(set)?.get_mut(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> Store {
        let mut store = Store::default();
        let row = json!({"id": 1, "name": "a", "rank": 1});
        store
            .apply(&[Change::Insert {
                set: "items",
                key: "1",
                value: &row,
            }])
            .unwrap();
        store
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let mut store = seeded();
        let fresh = json!({"id": 2});
        let duplicate = json!({"id": 1});
        let err = store
            .apply(&[
                Change::Insert {
                    set: "items",
                    key: "2",
                    value: &fresh,
                },
                Change::Insert {
                    set: "items",
                    key: "1",
                    value: &duplicate,
                },
            ])
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateKey { .. }));
        assert_eq!(store.len("items"), 1);
    }

    #[test]
    fn test_merge_only_touches_listed_properties() {
        let mut store = seeded();
        let value = json!({"id": 1, "name": "changed", "rank": 9});
        let properties = BTreeSet::from(["name".to_string()]);
        let affected = store
            .apply(&[Change::Merge {
                set: "items",
                key: "1",
                value: &value,
                properties: &properties,
            }])
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(
            store.get("items", "1"),
            Some(&json!({"id": 1, "name": "changed", "rank": 1}))
        );
    }

    #[test]
    fn test_delete_of_missing_row_is_skipped() {
        let mut store = seeded();
        let affected = store
            .apply(&[Change::Delete {
                set: "items",
                key: "42",
            }])
            .unwrap();
        assert_eq!(affected, 0);
        assert_eq!(store.len("items"), 1);
    }

    #[test]
    fn test_replace_of_missing_row_fails() {
        let mut store = Store::default();
        let value = json!({"id": 1});
        let err = store
            .apply(&[Change::Replace {
                set: "items",
                key: "1",
                value: &value,
            }])
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingRow { .. }));
    }
}
