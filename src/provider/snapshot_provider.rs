//! Snapshot-backed configuration provider.

use super::{ConfigProvider, ConfigSource};
use crate::error::Result;
use crate::model::{ConfigSnapshot, ConfigValues};
use crate::types::{ConfigStats, RefreshOutcome};
use arc_swap::ArcSwap;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A provider serving reads from an immutable, atomically replaced snapshot.
///
/// Reads are lock-free: each lookup loads the current `Arc<ConfigSnapshot>`
/// once and answers from it. Refreshes build the next generation off to the
/// side and publish it with a single pointer swap, so a reader sees either
/// the old or the new generation in full.
///
/// Refreshes are serialized among themselves so generations increase by one
/// per successful refresh.
///
/// # Example
///
/// ```
/// use appconfig_evaluator::provider::{ConfigProvider, SnapshotProvider, StaticSource};
/// use std::sync::Arc;
///
/// let source = Arc::new(
///     StaticSource::from_json(r#"{"services": {"dpsm-api": {"cache": {"ttlSeconds": 60}}}}"#)
///         .unwrap(),
/// );
/// let provider = SnapshotProvider::new(source.clone()).unwrap();
/// assert_eq!(provider.get_int("services.dpsm-api.cache.ttlSeconds", 300), 60);
/// assert_eq!(provider.current_version(), "1");
///
/// source.set("services.dpsm-api.cache.ttlSeconds", 120.into());
/// let outcome = provider.manual_refresh().unwrap();
/// assert_eq!(outcome.version, "2");
/// assert_eq!(provider.get_int("services.dpsm-api.cache.ttlSeconds", 300), 120);
/// ```
pub struct SnapshotProvider {
    source: Arc<dyn ConfigSource>,
    current: ArcSwap<ConfigSnapshot>,
    refresh_guard: Mutex<()>,
    refresh_count: AtomicU64,
    failed_refresh_count: AtomicU64,
}

impl SnapshotProvider {
    /// Creates a provider and loads the first generation from `source`.
    ///
    /// # Errors
    ///
    /// Returns the source's error if the initial load fails.
    pub fn new(source: Arc<dyn ConfigSource>) -> Result<Self> {
        let values = source.load()?;
        let initial = ConfigSnapshot::new(values, 1);
        tracing::info!(
            source = %source.name(),
            keys = initial.len(),
            "Loaded initial configuration snapshot"
        );

        Ok(Self {
            source,
            current: ArcSwap::new(Arc::new(initial)),
            refresh_guard: Mutex::new(()),
            refresh_count: AtomicU64::new(1),
            failed_refresh_count: AtomicU64::new(0),
        })
    }

    /// Publishes a new generation built from `values`, bypassing the source.
    ///
    /// This is how push-based integrations hand over configuration they
    /// received themselves.
    pub fn publish(&self, values: ConfigValues) -> RefreshOutcome {
        let _guard = self
            .refresh_guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.swap_in(values)
    }

    fn swap_in(&self, values: ConfigValues) -> RefreshOutcome {
        let previous = self.current.load_full();
        let next = ConfigSnapshot::new(values, previous.generation() + 1);
        let changed_keys = next.diff_keys(&previous);
        let version = next.generation().to_string();

        self.current.store(Arc::new(next));
        self.refresh_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            version = %version,
            changed = changed_keys.len(),
            "Configuration snapshot refreshed"
        );

        RefreshOutcome {
            version,
            changed_keys,
        }
    }

    fn load(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }
}

impl ConfigProvider for SnapshotProvider {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.load().get_bool(key, default)
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.load().get_int(key, default)
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.load().get_string(key, default)
    }

    fn get_value(&self, key: &str, default: Value) -> Value {
        self.load().get(key).cloned().unwrap_or(default)
    }

    fn has_configuration(&self, key: &str) -> bool {
        self.load().contains(key)
    }

    fn keys(&self) -> BTreeSet<String> {
        self.load().keys()
    }

    fn manual_refresh(&self) -> Result<RefreshOutcome> {
        let _guard = self
            .refresh_guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match self.source.load() {
            Ok(values) => Ok(self.swap_in(values)),
            Err(e) => {
                self.failed_refresh_count.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    source = %self.source.name(),
                    error = %e,
                    version = %self.load().generation(),
                    "Configuration refresh failed, keeping current snapshot"
                );
                Err(e)
            }
        }
    }

    fn current_version(&self) -> String {
        self.load().generation().to_string()
    }

    fn stats(&self) -> ConfigStats {
        let snapshot = self.load();
        ConfigStats {
            key_count: snapshot.len(),
            version: snapshot.generation().to_string(),
            last_refresh_time: snapshot.refreshed_at(),
            refresh_count: self.refresh_count.load(Ordering::Relaxed),
            failed_refresh_count: self.failed_refresh_count.load(Ordering::Relaxed),
            source: self.source.name(),
        }
    }

    fn snapshot(&self) -> Option<Arc<ConfigSnapshot>> {
        Some(self.load())
    }
}

impl std::fmt::Debug for SnapshotProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotProvider")
            .field("source", &self.source.name())
            .field("version", &self.current_version())
            .finish()
    }
}
