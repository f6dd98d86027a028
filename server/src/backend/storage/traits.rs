//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    Appointment, PlanInstallment, Reminder, TarotAnalysis, ANALYSES_KEY, APPOINTMENTS_KEY,
    PLANS_KEY, REMINDERS_KEY,
};

/// Trait defining a flat key-value store of JSON documents
///
/// Every collection lives under one fixed key as a JSON-encoded array, the
/// same layout the dashboard page kept in browser local storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw document stored under `key`, `None` when nothing was written yet
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the document stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the document stored under `key`
    /// Returns true if something was removed
    fn remove(&self, key: &str) -> Result<bool>;

    /// Keep a copy of a document that failed to parse before it gets overwritten.
    /// A document identical to one already kept for `key` is not copied again.
    fn preserve_corrupt(&self, _key: &str, _raw: &str) -> Result<()> {
        Ok(())
    }
}

/// A record type persisted as one element of a keyed JSON array
pub trait StoredRecord: Serialize + DeserializeOwned + Clone {
    /// Storage key of the collection
    const KEY: &'static str;

    fn record_id(&self) -> &str;
}

impl StoredRecord for Appointment {
    const KEY: &'static str = APPOINTMENTS_KEY;

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl StoredRecord for TarotAnalysis {
    const KEY: &'static str = ANALYSES_KEY;

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl StoredRecord for PlanInstallment {
    const KEY: &'static str = PLANS_KEY;

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl StoredRecord for Reminder {
    const KEY: &'static str = REMINDERS_KEY;

    fn record_id(&self) -> &str {
        &self.id
    }
}
