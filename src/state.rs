//! Restorable controller state.
//!
//! A [`SavedState`] is a shared key/value slot that controllers write their
//! transient state into (search text, in-progress edits) so a host can
//! persist it and hand it back after a restart.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Shared, cloneable key/value slot backed by JSON values.
#[derive(Clone, Default)]
pub struct SavedState {
    values: Arc<Mutex<Map<String, Value>>>,
}

impl SavedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a JSON object previously produced by [`SavedState::to_json`].
    /// Anything other than an object restores to an empty state.
    pub fn from_json(value: Value) -> Self {
        let values = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            values: Arc::new(Mutex::new(values)),
        }
    }

    /// Snapshot of every stored entry.
    pub fn to_json(&self) -> Value {
        Value::Object(self.lock().clone())
    }

    /// Read a value. Entries that no longer deserialize into `T` read as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lock().get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "ignoring unreadable saved state entry");
                None
            }
        }
    }

    /// Write a value, replacing any previous one.
    pub fn set<T: Serialize>(&self, key: &str, value: T) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.lock().insert(key.to_string(), v);
            }
            Err(e) => warn!(key, error = %e, "could not save state entry"),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Map<String, Value>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Task;
    use serde_json::json;

    #[test]
    fn set_and_get_roundtrip() {
        let state = SavedState::new();
        state.set("task_name", "Groceries");
        state.set("task_importance", true);

        assert_eq!(state.get::<String>("task_name").as_deref(), Some("Groceries"));
        assert_eq!(state.get::<bool>("task_importance"), Some(true));
        assert_eq!(state.get::<bool>("missing"), None);
    }

    #[test]
    fn clones_share_storage() {
        let state = SavedState::new();
        let other = state.clone();
        other.set("search_query", "milk");
        assert_eq!(state.get::<String>("search_query").as_deref(), Some("milk"));
    }

    #[test]
    fn restores_from_json() {
        let task = Task {
            id: 3,
            name: "Call mom".into(),
            important: true,
            completed: false,
            created: 1_700_000_000_000,
        };
        let state = SavedState::new();
        state.set("task", &task);

        let restored = SavedState::from_json(state.to_json());
        assert_eq!(restored.get::<Task>("task"), Some(task));
    }

    #[test]
    fn wrong_type_reads_as_absent() {
        let state = SavedState::from_json(json!({ "task_importance": "yes" }));
        assert!(state.contains("task_importance"));
        assert_eq!(state.get::<bool>("task_importance"), None);

        state.remove("task_importance");
        assert!(!state.contains("task_importance"));
    }

    #[test]
    fn non_object_restores_empty() {
        let state = SavedState::from_json(json!([1, 2, 3]));
        assert_eq!(state.to_json(), json!({}));
    }
}
