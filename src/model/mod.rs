//! Models for configuration snapshots.
//!
//! A snapshot is the flat, dotted key/value view a provider serves reads from.
//! Nested JSON or YAML documents are flattened on load.

mod snapshot;

pub use snapshot::{ConfigSnapshot, ConfigValues};
