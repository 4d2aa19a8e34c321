//! Shared flow context

use cephmon_core::Result;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// String-keyed bag shared by every flow of a chain. Clones share storage.
#[derive(Clone, Default)]
pub struct FlowData {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl FlowData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.entries.lock().insert(key.into(), value);
        Ok(())
    }

    /// `Ok(None)` when the key is absent; an error when the stored value does
    /// not deserialize as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let value = self.entries.lock().get(key).cloned();
        match value {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl fmt::Debug for FlowData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();
        f.debug_struct("FlowData").field("keys", &keys).finish()
    }
}
