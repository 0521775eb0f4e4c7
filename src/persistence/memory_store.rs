use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::PersistenceError;
use super::store::{PersistentStore, check_key};

/// Volatile store for tests and throwaway sessions.
///
/// Writes can be switched off to exercise save-failure handling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail until switched back.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        check_key(key)?;
        let entries = self
            .entries
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        check_key(key)?;
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(format!(
                "writes to {key} are disabled"
            )));
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_writes_keep_previous_value() {
        let store = MemoryStore::new();
        store.put("model/metrics.json", b"old").unwrap();
        store.set_reject_writes(true);
        assert!(store.put("model/metrics.json", b"new").is_err());
        store.set_reject_writes(false);
        assert_eq!(store.get("model/metrics.json").unwrap().unwrap(), b"old");
        assert_eq!(store.keys(), vec!["model/metrics.json"]);
    }
}
