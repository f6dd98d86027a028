//! # JSON File Storage
//!
//! File-based implementation of the key-value store. Each storage key maps to
//! a single JSON document in the data directory, written atomically through a
//! temp file and rename.

pub mod connection;

pub use connection::{is_valid_key, JsonConnection};
