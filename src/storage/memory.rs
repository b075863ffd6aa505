use super::{KeyValueStorage, StorageKey};
use crate::error::{ChatlineError, StoreResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-process storage
///
/// Clones share the same map, so a test can keep one handle for inspection
/// while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<StorageKey, String>>>,
}

impl MemoryStorage {
    /// Creates an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage pre-seeded with entries
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (StorageKey, String)>,
    {
        let storage = Self::new();
        if let Ok(mut map) = storage.entries.lock() {
            map.extend(entries);
        }
        storage
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<StorageKey, String>>> {
        self.entries
            .lock()
            .map_err(|_| ChatlineError::Storage("memory storage lock poisoned".to_string()))
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: StorageKey) -> StoreResult<Option<String>> {
        Ok(self.lock()?.get(&key).cloned())
    }

    fn set(&self, key: StorageKey, value: &str) -> StoreResult<()> {
        self.lock()?.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> StoreResult<()> {
        self.lock()?.remove(&key);
        Ok(())
    }

    fn write_batch(&self, entries: &[(StorageKey, Option<String>)]) -> StoreResult<()> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            match value {
                Some(v) => {
                    map.insert(*key, v.clone());
                }
                None => {
                    map.remove(key);
                }
            }
        }
        Ok(())
    }
}
