//! Whole-collection documents over a [`KeyValueStore`], plus an in-memory
//! store.
//!
//! Every logical collection (questions per exam type, schedules, attempts,
//! feedback) is one JSON array stored under one key. Reads of a missing key
//! yield an empty collection.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AssessError, Result, StoreError};
use crate::traits::KeyValueStore;

pub const SCHEDULES_KEY: &str = "examSchedules";
pub const ATTEMPTS_KEY: &str = "attempts";
pub const FEEDBACK_KEY: &str = "adminFeedback";
pub const ACTIVE_SCHEDULE_KEY: &str = "currentExamSchedule";
pub const USERS_KEY: &str = "users";
pub const ATTEMPTS_SCHEMA_KEY: &str = "attemptsSchemaVersion";

/// Read a single JSON document.
pub fn load_document<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| AssessError::CorruptDocument {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Write a single JSON document.
pub fn save_document<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value).map_err(|source| AssessError::CorruptDocument {
        key: key.to_string(),
        source,
    })?;
    store.set(key, json)?;
    Ok(())
}

/// Read a whole collection; a missing key is an empty collection.
pub fn load_collection<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Vec<T>> {
    Ok(load_document(store, key)?.unwrap_or_default())
}

/// Replace a whole collection.
pub fn save_collection<T: Serialize>(store: &dyn KeyValueStore, key: &str, items: &[T]) -> Result<()> {
    save_document(store, key, items)
}

/// A process-local store, optionally limited to a byte quota.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes once keys plus values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(bytes),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes counted against the quota: every key plus its value.
    pub fn used_bytes(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = used + key.len() + value.len();
            if needed > quota {
                return Err(StoreError::Exhausted {
                    key: key.to_string(),
                    reason: format!("{needed} bytes exceeds quota of {quota}"),
                });
            }
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}
