//! # Storage Module
//!
//! Handles all data persistence for the practice back office.
//!
//! The dashboard page this replaces kept every collection as a JSON array in
//! browser local storage under a fixed key (`atendimentos`, `analises`,
//! `planos`, `lembretes`). The storage layer keeps that layout:
//!
//! - **KeyValueStore**: the raw key → JSON document abstraction
//! - **JsonConnection**: one `<key>.json` file per key in the data directory
//! - **MemoryStore**: in-memory documents for tests
//! - **RecordStore**: typed collections with lenient decoding and a
//!   store-wide write lock for read-modify-write sequences

pub mod json;
pub mod memory;
pub mod record_store;
pub mod traits;

pub use json::JsonConnection;
pub use memory::MemoryStore;
pub use record_store::{LoadedCollection, RecordStore, StoreSession};
pub use traits::{KeyValueStore, StoredRecord};
