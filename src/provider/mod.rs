//! Configuration provider boundary.
//!
//! The evaluator never owns configuration. It reads through a
//! [`ConfigProvider`], which supplies defaulted typed lookups over its current
//! snapshot and can be told to refresh that snapshot.
//!
//! [`SnapshotProvider`] is the in-process implementation: it keeps the current
//! [`ConfigSnapshot`] behind an atomically swapped pointer and reloads it from
//! a [`ConfigSource`].

mod snapshot_provider;
mod sources;

pub use snapshot_provider::SnapshotProvider;
pub use sources::{FileSource, StaticSource};

use crate::error::Result;
use crate::model::{ConfigSnapshot, ConfigValues};
use crate::types::{ConfigStats, RefreshOutcome};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Typed, defaulted access to a refreshable configuration store.
///
/// Lookups never fail: an absent or malformed value yields the supplied
/// default. Implementations must be safe to read concurrently with
/// [`manual_refresh`](ConfigProvider::manual_refresh), and readers must never
/// observe a partially applied refresh.
pub trait ConfigProvider: Send + Sync {
    fn get_bool(&self, key: &str, default: bool) -> bool;

    fn get_int(&self, key: &str, default: i64) -> i64;

    fn get_string(&self, key: &str, default: &str) -> String;

    /// Untyped passthrough of a stored value.
    fn get_value(&self, key: &str, default: Value) -> Value;

    /// Existence check independent of the stored type.
    fn has_configuration(&self, key: &str) -> bool;

    /// All known keys, sorted.
    fn keys(&self) -> BTreeSet<String>;

    /// Reloads the snapshot out of band.
    ///
    /// On failure the previously served snapshot stays in place.
    fn manual_refresh(&self) -> Result<RefreshOutcome>;

    /// Version identifier of the snapshot currently served.
    fn current_version(&self) -> String;

    fn stats(&self) -> ConfigStats;

    /// Pins the current snapshot so that several reads see one generation.
    ///
    /// Providers that are not snapshot-backed return `None`, in which case
    /// callers fall back to individual lookups.
    fn snapshot(&self) -> Option<Arc<ConfigSnapshot>> {
        None
    }
}

/// Where a provider obtains a fresh generation of configuration.
pub trait ConfigSource: Send + Sync {
    /// Loads the complete set of flat key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or parsed.
    fn load(&self) -> Result<ConfigValues>;

    /// Human-readable name for logging and statistics.
    fn name(&self) -> String;
}
