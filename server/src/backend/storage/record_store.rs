//! # Record Store
//!
//! Typed access to the keyed JSON arrays on top of any [`KeyValueStore`].
//!
//! Reads never fail on bad data: a document that is not a JSON array reads as
//! an empty collection and unreadable elements are skipped, both with a
//! warning. Writers take a [`StoreSession`], which holds the store-wide write
//! lock for the whole read-modify-write sequence so concurrent requests cannot
//! overwrite each other's changes.

use anyhow::Result;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    Appointment, PlanInstallment, Reminder, TarotAnalysis, ANALYSES_KEY, APPOINTMENTS_KEY,
    PLANS_KEY, REMINDERS_KEY,
};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::storage::traits::{KeyValueStore, StoredRecord};

#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Read a whole collection without taking the write lock
    pub fn load_all<T: StoredRecord>(&self) -> Result<Vec<T>> {
        decode_collection(self.backend.as_ref(), T::KEY, false).map(|loaded| loaded.records)
    }

    /// Start a read-modify-write session
    pub fn session(&self) -> Result<StoreSession<'_>> {
        let guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Record store lock poisoned"))?;
        Ok(StoreSession {
            backend: self.backend.as_ref(),
            _guard: guard,
        })
    }

    /// Raw JSON document of one collection, for backups
    pub fn load_raw(&self, key: &str) -> Result<Option<String>> {
        ensure_collection_key(key)?;
        self.backend.get(key)
    }

    /// Replace one collection with a backup document
    /// Returns the number of records restored
    pub fn restore_raw(&self, key: &str, raw: &str) -> Result<usize> {
        let count = match key {
            APPOINTMENTS_KEY => validate_document::<Appointment>(raw)?,
            ANALYSES_KEY => validate_document::<TarotAnalysis>(raw)?,
            PLANS_KEY => validate_document::<PlanInstallment>(raw)?,
            REMINDERS_KEY => validate_document::<Reminder>(raw)?,
            other => return Err(anyhow::anyhow!("Unknown collection: {}", other)),
        };

        let _session = self.session()?;
        self.backend.set(key, raw)?;
        Ok(count)
    }
}

/// A decoded collection; `degraded` is set when unreadable data was dropped while reading it
#[derive(Debug, Clone)]
pub struct LoadedCollection<T> {
    pub records: Vec<T>,
    pub degraded: bool,
}

impl<T> LoadedCollection<T> {
    fn clean(records: Vec<T>) -> Self {
        Self {
            records,
            degraded: false,
        }
    }

    fn partial(records: Vec<T>) -> Self {
        Self {
            records,
            degraded: true,
        }
    }
}

/// Exclusive access to the store for one read-modify-write sequence
pub struct StoreSession<'a> {
    backend: &'a dyn KeyValueStore,
    _guard: MutexGuard<'a, ()>,
}

impl StoreSession<'_> {
    /// Read a collection; unreadable documents are preserved before they can be overwritten
    pub fn load_all<T: StoredRecord>(&self) -> Result<Vec<T>> {
        self.load_checked().map(|loaded| loaded.records)
    }

    /// Like [`StoreSession::load_all`], also reporting whether anything was dropped
    pub fn load_checked<T: StoredRecord>(&self) -> Result<LoadedCollection<T>> {
        decode_collection(self.backend, T::KEY, true)
    }

    pub fn save_all<T: StoredRecord>(&self, records: &[T]) -> Result<()> {
        let document = serde_json::to_string(records)?;
        self.backend.set(T::KEY, &document)?;
        debug!("Saved {} records under '{}'", records.len(), T::KEY);
        Ok(())
    }
}

fn ensure_collection_key(key: &str) -> Result<()> {
    if shared::COLLECTION_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Unknown collection: {}", key))
    }
}

fn validate_document<T: DeserializeOwned>(raw: &str) -> Result<usize> {
    let records: Vec<T> = serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("Backup document is not a valid collection: {}", e))?;
    Ok(records.len())
}

fn decode_collection<T: DeserializeOwned>(
    backend: &dyn KeyValueStore,
    key: &str,
    preserve_on_error: bool,
) -> Result<LoadedCollection<T>> {
    let raw = match backend.get(key)? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(LoadedCollection::clean(Vec::new())),
    };

    let items = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Null) => return Ok(LoadedCollection::clean(Vec::new())),
        Ok(_) => {
            warn!("Document under '{}' is not an array, reading it as empty", key);
            preserve(backend, key, &raw, preserve_on_error);
            return Ok(LoadedCollection::partial(Vec::new()));
        }
        Err(e) => {
            warn!("Document under '{}' is not valid JSON ({}), reading it as empty", key, e);
            preserve(backend, key, &raw, preserve_on_error);
            return Ok(LoadedCollection::partial(Vec::new()));
        }
    };

    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0usize;
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping unreadable record #{} under '{}': {}", index, key, e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        preserve(backend, key, &raw, preserve_on_error);
        return Ok(LoadedCollection::partial(records));
    }

    Ok(LoadedCollection::clean(records))
}

fn preserve(backend: &dyn KeyValueStore, key: &str, raw: &str, enabled: bool) {
    if !enabled {
        return;
    }
    if let Err(e) = backend.preserve_corrupt(key, raw) {
        warn!("Could not preserve unreadable '{}' document: {}", key, e);
    }
}
