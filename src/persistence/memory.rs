//! In-process key-value store.
//!
//! Clones share the same map, so a test can keep a handle to inspect what a
//! [`super::PersistenceStore`] wrote.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::KeyValueStore;
use crate::error::StorageError;

/// Volatile store backed by a shared map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored entry.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries.lock().clone()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write_batch(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut map = self.entries.lock();
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_entries() {
        let store = MemoryKeyValueStore::new();
        let handle = store.clone();
        store.write_batch(&[("a", "1".to_string())]).unwrap();
        assert_eq!(handle.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(handle.get("b").unwrap(), None);
    }
}
