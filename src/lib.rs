//! # appconfig-evaluator
//!
//! Feature flag and operational limit evaluation over a dynamically
//! refreshable configuration store.
//!
//! ## Features
//!
//! - **Feature flags**: global on/off switches read from
//!   `services.<app>.features.<name>.enabled`
//! - **Percentage rollout**: sticky per-user rollout driven by
//!   `services.<app>.features.<name>.rolloutPercentage`, bucketed with
//!   MurmurHash3 so a user keeps its assignment across refreshes and processes
//! - **Operational limits**: rate limits, upload size, timeouts and cache
//!   settings with fixed defaults
//! - **Hot reload**: snapshots are swapped atomically; readers never observe
//!   a partially applied refresh
//!
//! ## Example
//!
//! ```
//! use appconfig_evaluator::provider::{SnapshotProvider, StaticSource};
//! use appconfig_evaluator::FlagEvaluator;
//! use std::sync::Arc;
//!
//! let source = Arc::new(StaticSource::default());
//! source.set("services.dpsm-api.features.exportData.enabled", true.into());
//!
//! let provider = Arc::new(SnapshotProvider::new(source.clone()).unwrap());
//! let evaluator = FlagEvaluator::new(provider);
//! assert!(evaluator.is_feature_enabled("exportData"));
//!
//! source.set("services.dpsm-api.features.exportData.enabled", false.into());
//! evaluator.refresh().unwrap();
//! assert!(!evaluator.is_feature_enabled("exportData"));
//! ```

pub mod bucket;
pub mod error;
pub mod evaluator;
pub mod keys;
pub mod model;
pub mod provider;
pub mod types;

pub use bucket::{bucket, in_rollout};
pub use error::{ErrorType, EvaluatorError};
pub use evaluator::FlagEvaluator;
pub use keys::Namespace;
pub use model::ConfigSnapshot;
pub use provider::{ConfigProvider, ConfigSource, FileSource, SnapshotProvider, StaticSource};
pub use types::{CacheSettings, ConfigEntry, ConfigStats, FeatureStatus, Limits, RefreshResponse};

/// Gets the current Unix timestamp in seconds, or 0 if the clock is before
/// the epoch.
pub fn get_current_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
