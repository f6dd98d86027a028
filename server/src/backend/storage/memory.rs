//! In-memory key-value store, used by tests and for throwaway sessions.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::backend::storage::traits::KeyValueStore;

#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<HashMap<String, String>>>,
    corrupt: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents handed to `preserve_corrupt`, oldest first
    pub fn preserved(&self) -> Vec<(String, String)> {
        self.corrupt.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("Memory store lock poisoned")
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.documents.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.documents
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.documents.lock().map_err(poisoned)?.remove(key).is_some())
    }

    fn preserve_corrupt(&self, key: &str, raw: &str) -> Result<()> {
        let mut corrupt = self.corrupt.lock().map_err(poisoned)?;
        if !corrupt.iter().any(|(k, r)| k == key && r == raw) {
            corrupt.push((key.to_string(), raw.to_string()));
        }
        Ok(())
    }
}
