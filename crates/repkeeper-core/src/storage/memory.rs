//! In-memory key-value store.
//!
//! Clones share the same map, which makes it usable as the agent mirror in
//! tests: one clone is handed to the runtime, another plays the external
//! writer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::KeyValueStore;
use crate::error::StorageError;

#[derive(Debug, Default)]
struct Inner {
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail, simulating an unavailable store.
    pub fn set_failing(&self, failing: bool) {
        self.inner.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.inner
            .values
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("write to '{key}' refused")));
        }
        self.values()?.insert(key.to_string(), value.to_string());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values()?.remove(key);
        Ok(())
    }
}
