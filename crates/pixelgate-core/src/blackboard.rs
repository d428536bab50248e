//! # Blackboard
//!
//! Shared, thread-safe key/value scratch space.
//!
//! Nodes, conditions, actions and legacy rules read and write it during a
//! tick; editors and input listeners may touch it concurrently from other
//! threads. The blackboard has its own lock, independent of the engine's.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe key/value store.
#[derive(Debug, Default)]
pub struct Blackboard {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl Blackboard {
    /// Create an empty blackboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        // A panic while holding the lock cannot leave a map half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a value, or `default` when the key is absent.
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.lock().get(key).cloned().unwrap_or(default)
    }

    /// Set a value, replacing any previous one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.lock().insert(key.into(), value.into());
    }

    /// Remove a key. Missing keys are ignored.
    pub fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Remove every key.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Check whether a key is present.
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Read a boolean; non-boolean or missing values yield `default`.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.lock()
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// Read an unsigned integer; anything else yields `None`.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.lock().get(key).and_then(Value::as_u64)
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of all entries in key order.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.lock().clone()
    }
}
