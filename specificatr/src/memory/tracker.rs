//! Change tracking for the in-memory context

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde_json::Value;

use super::store::{Change, Store};
use crate::engine::EngineError;

/// Lifecycle of a tracked entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    /// Matches the stored row
    Unchanged,
    /// Staged for insert
    Added,
    /// Staged for a full row replacement
    Modified,
    /// Staged for an update of the listed properties only
    PartiallyModified(BTreeSet<String>),
    /// Staged for delete
    Deleted,
}

#[derive(Debug, Clone)]
struct Entry {
    state: EntryState,
    value: Value,
}

type EntryKey = (&'static str, String);

/// Tracked entities keyed by entity set and row key, in tracking order
#[derive(Debug, Default)]
pub(crate) struct ChangeTracker {
    entries: IndexMap<EntryKey, Entry>,
}

impl ChangeTracker {
    /// Track a row read from the store; an existing entry wins
    pub(crate) fn track_unchanged(&mut self, set: &'static str, key: String, value: Value) {
        self.entries.entry((set, key)).or_insert(Entry {
            state: EntryState::Unchanged,
            value,
        });
    }

    pub(crate) fn add(&mut self, set: &'static str, key: String, value: Value) -> Result<(), EngineError> {
        match self.entries.get_mut(&(set, key.clone())) {
            Some(entry) if entry.state == EntryState::Deleted => {
                entry.state = EntryState::Modified;
                entry.value = value;
                Ok(())
            }
            Some(_) => Err(EngineError::DuplicateKey {
                entity_set: set.to_string(),
                key,
            }),
            None => {
                self.entries.insert(
                    (set, key),
                    Entry {
                        state: EntryState::Added,
                        value,
                    },
                );
                Ok(())
            }
        }
    }

    pub(crate) fn remove(&mut self, set: &'static str, key: String, value: Value) {
        let entry_key = (set, key);
        let state = self.entries.get(&entry_key).map(|entry| entry.state.clone());
        match state {
            // never stored, nothing to delete
            Some(EntryState::Added) => {
                self.entries.shift_remove(&entry_key);
            }
            Some(_) => {
                if let Some(entry) = self.entries.get_mut(&entry_key) {
                    entry.state = EntryState::Deleted;
                }
            }
            None => {
                self.entries.insert(
                    entry_key,
                    Entry {
                        state: EntryState::Deleted,
                        value,
                    },
                );
            }
        }
    }

    pub(crate) fn update(&mut self, set: &'static str, key: String, value: Value) {
        let entry = self.entries.entry((set, key)).or_insert(Entry {
            state: EntryState::Modified,
            value: Value::Null,
        });
        if entry.state != EntryState::Added {
            entry.state = EntryState::Modified;
        }
        entry.value = value;
    }

    /// Track `value` without staging a change; an existing entry takes the new value
    pub(crate) fn attach(&mut self, set: &'static str, key: String, value: Value) {
        self.entries
            .entry((set, key))
            .and_modify(|entry| entry.value = value.clone())
            .or_insert(Entry {
                state: EntryState::Unchanged,
                value,
            });
    }

    pub(crate) fn mark_modified(
        &mut self,
        set: &'static str,
        key: String,
        property: &str,
    ) -> Result<(), EngineError> {
        let Some(entry) = self.entries.get_mut(&(set, key.clone())) else {
            return Err(EngineError::NotTracked {
                entity_set: set.to_string(),
                key,
            });
        };

        let known = entry
            .value
            .as_object()
            .is_some_and(|object| object.contains_key(property));
        if !known {
            return Err(EngineError::UnknownProperty {
                entity_set: set.to_string(),
                property: property.to_string(),
            });
        }

        // added, fully modified and deleted entries already cover every property
        if let EntryState::PartiallyModified(properties) = &mut entry.state {
            properties.insert(property.to_string());
        } else if entry.state == EntryState::Unchanged {
            entry.state = EntryState::PartiallyModified(BTreeSet::from([property.to_string()]));
        }
        Ok(())
    }

    pub(crate) fn state(&self, set: &'static str, key: &str) -> Option<&EntryState> {
        self.entries
            .get(&(set, key.to_string()))
            .map(|entry| &entry.state)
    }

    /// Staged changes in tracking order
    pub(crate) fn changes(&self) -> Vec<Change<'_>> {
        self.entries
            .iter()
            .filter_map(|((set, key), entry)| {
                let (set, key) = (*set, key.as_str());
                let change = match &entry.state {
                    EntryState::Unchanged => return None,
                    EntryState::Added => Change::Insert {
                        set,
                        key,
                        value: &entry.value,
                    },
                    EntryState::Modified => Change::Replace {
                        set,
                        key,
                        value: &entry.value,
                    },
                    EntryState::PartiallyModified(properties) => Change::Merge {
                        set,
                        key,
                        value: &entry.value,
                        properties,
                    },
                    EntryState::Deleted => Change::Delete { set, key },
                };
                Some(change)
            })
            .collect()
    }

    /// Reset every entry to unchanged after a successful save
    ///
    /// Deleted entries are dropped; the others take the stored row as their
    /// value so partial updates see the merged result.
    pub(crate) fn accept_changes(&mut self, store: &Store) {
        self.entries
            .retain(|_, entry| entry.state != EntryState::Deleted);
        for ((set, key), entry) in &mut self.entries {
            if let Some(row) = store.get(set, key) {
                entry.value = row.clone();
            }
            entry.state = EntryState::Unchanged;
        }
    }

    /// Drop every staged change, returning how many were discarded
    ///
    /// Entries backed by a stored row go back to unchanged with the stored
    /// value; staged entries without one are forgotten.
    pub(crate) fn reject_changes(&mut self, store: &Store) -> usize {
        let mut discarded = 0;
        self.entries.retain(|(set, key), entry| {
            if entry.state == EntryState::Unchanged {
                return true;
            }
            discarded += 1;
            match store.get(set, key) {
                Some(row) => {
                    entry.value = row.clone();
                    entry.state = EntryState::Unchanged;
                    true
                }
                None => false,
            }
        });
        discarded
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SET: &str = "items";

    #[test]
    fn test_add_twice_is_duplicate() {
        let mut tracker = ChangeTracker::default();
        tracker.add(SET, "1".into(), json!({"id": 1})).unwrap();
        let err = tracker.add(SET, "1".into(), json!({"id": 1})).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateKey { .. }));
    }

    #[test]
    fn test_remove_of_added_entry_forgets_it() {
        let mut tracker = ChangeTracker::default();
        tracker.add(SET, "1".into(), json!({"id": 1})).unwrap();
        tracker.remove(SET, "1".into(), json!({"id": 1}));
        assert_eq!(tracker.len(), 0);
        assert!(tracker.changes().is_empty());
    }

    #[test]
    fn test_update_keeps_added_state() {
        let mut tracker = ChangeTracker::default();
        tracker.add(SET, "1".into(), json!({"id": 1, "name": "a"})).unwrap();
        tracker.update(SET, "1".into(), json!({"id": 1, "name": "b"}));
        assert_eq!(tracker.state(SET, "1"), Some(&EntryState::Added));
    }

    #[test]
    fn test_mark_modified_collects_properties() {
        let mut tracker = ChangeTracker::default();
        tracker.attach(SET, "1".into(), json!({"id": 1, "name": "a", "rank": 2}));
        tracker.mark_modified(SET, "1".into(), "name").unwrap();
        tracker.mark_modified(SET, "1".into(), "rank").unwrap();
        assert_eq!(
            tracker.state(SET, "1"),
            Some(&EntryState::PartiallyModified(BTreeSet::from([
                "name".to_string(),
                "rank".to_string()
            ])))
        );
    }

    #[test]
    fn test_mark_modified_rejects_unknown_property_and_untracked_entity() {
        let mut tracker = ChangeTracker::default();
        assert!(matches!(
            tracker.mark_modified(SET, "1".into(), "name"),
            Err(EngineError::NotTracked { .. })
        ));

        tracker.attach(SET, "1".into(), json!({"id": 1}));
        assert!(matches!(
            tracker.mark_modified(SET, "1".into(), "missing"),
            Err(EngineError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_reject_changes_restores_stored_rows() {
        let mut store = Store::default();
        store
            .apply(&[Change::Insert {
                set: SET,
                key: "1",
                value: &json!({"id": 1, "name": "stored"}),
            }])
            .unwrap();

        let mut tracker = ChangeTracker::default();
        tracker.update(SET, "1".into(), json!({"id": 1, "name": "edited"}));
        tracker.add(SET, "2".into(), json!({"id": 2})).unwrap();
        tracker.remove(SET, "3".into(), json!({"id": 3}));
        tracker.track_unchanged(SET, "4".into(), json!({"id": 4}));

        assert_eq!(tracker.reject_changes(&store), 3);
        assert!(tracker.changes().is_empty());
        assert_eq!(tracker.state(SET, "1"), Some(&EntryState::Unchanged));
        assert_eq!(tracker.state(SET, "2"), None);
        assert_eq!(tracker.state(SET, "4"), Some(&EntryState::Unchanged));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_unchanged_entries_produce_no_changes() {
        let mut tracker = ChangeTracker::default();
        tracker.track_unchanged(SET, "1".into(), json!({"id": 1}));
        assert!(tracker.changes().is_empty());
        assert_eq!(tracker.len(), 1);
    }
}
