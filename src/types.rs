//! Serializable views returned by the evaluator.
//!
//! These mirror what an outer surface (an HTTP layer, the CLI) hands to its
//! callers. They are read-only snapshots of values resolved at call time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The resolved state of one feature flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStatus {
    /// Whether the feature is globally enabled.
    pub enabled: bool,

    /// Rollout percentage as stored, `0` when not configured.
    pub rollout_percentage: i64,
}

/// Operational request limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub max_requests_per_minute: i64,
    #[serde(rename = "maxUploadSizeMB")]
    pub max_upload_size_mb: i64,
    pub max_concurrent_requests: i64,
    pub request_timeout_seconds: i64,
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_seconds: i64,
    pub max_entries: i64,
}

/// A single raw configuration entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: Value,
}

/// Summary statistics about a provider's current snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStats {
    /// Number of keys in the current snapshot
    pub key_count: usize,

    /// Version identifier of the current snapshot
    pub version: String,

    /// Unix timestamp (seconds) of the last successful refresh, `0` if never
    pub last_refresh_time: u64,

    /// Number of successful refreshes
    pub refresh_count: u64,

    /// Number of refreshes that failed and left the snapshot untouched
    pub failed_refresh_count: u64,

    /// Human-readable name of the configuration source
    pub source: String,
}

/// Result of a successful refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    /// Version identifier of the snapshot now being served
    pub version: String,

    /// Sorted keys that were added, removed or changed
    pub changed_keys: Vec<String>,
}

/// Response of a manually triggered refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub message: String,
    pub version: String,
    pub changed_keys: Vec<String>,
}

impl From<RefreshOutcome> for RefreshResponse {
    fn from(outcome: RefreshOutcome) -> Self {
        Self {
            message: "Configuration refresh triggered".to_string(),
            version: outcome.version,
            changed_keys: outcome.changed_keys,
        }
    }
}

/// Status of every discovered feature, keyed by feature name.
pub type FeatureStatusMap = BTreeMap<String, FeatureStatus>;

/// Serializes any view to a JSON string, optionally pretty-printed.
pub fn to_json_string<T: Serialize>(view: &T, pretty: bool) -> String {
    let rendered = if pretty {
        serde_json::to_string_pretty(view)
    } else {
        serde_json::to_string(view)
    };
    rendered.unwrap_or_else(|e| format!(r#"{{"error":"Serialization failed: {}"}}"#, e))
}
