//! Feature flag and limit evaluation.
//!
//! [`FlagEvaluator`] is stateless apart from a provider handle and the key
//! namespace. Every call resolves fresh values from the provider, so a
//! refresh is visible to the very next evaluation. Calls that read several
//! keys pin one snapshot first when the provider supports it, so they never
//! combine values from two generations.

use crate::bucket;
use crate::error::{EvaluatorError, Result};
use crate::keys::{cache, limits, FeatureFacet, Namespace};
use crate::model::ConfigSnapshot;
use crate::provider::ConfigProvider;
use crate::types::{
    CacheSettings, ConfigEntry, ConfigStats, FeatureStatus, FeatureStatusMap, Limits,
    RefreshResponse,
};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Rollout percentage assumed for an enabled feature with none configured.
pub const DEFAULT_ROLLOUT_PERCENTAGE: i64 = 100;

/// Rollout percentage reported by discovery when none is configured.
pub const DISCOVERY_ROLLOUT_PERCENTAGE: i64 = 0;

/// Read access for the duration of one evaluation.
enum View<'a> {
    Pinned(Arc<ConfigSnapshot>),
    Live(&'a dyn ConfigProvider),
}

impl View<'_> {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self {
            View::Pinned(snapshot) => snapshot.get_bool(key, default),
            View::Live(provider) => provider.get_bool(key, default),
        }
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self {
            View::Pinned(snapshot) => snapshot.get_int(key, default),
            View::Live(provider) => provider.get_int(key, default),
        }
    }

    fn contains(&self, key: &str) -> bool {
        match self {
            View::Pinned(snapshot) => snapshot.contains(key),
            View::Live(provider) => provider.has_configuration(key),
        }
    }

    fn keys(&self) -> BTreeSet<String> {
        match self {
            View::Pinned(snapshot) => snapshot.keys(),
            View::Live(provider) => provider.keys(),
        }
    }
}

/// Evaluates feature flags and operational limits against a provider.
///
/// # Example
///
/// ```
/// use appconfig_evaluator::provider::{SnapshotProvider, StaticSource};
/// use appconfig_evaluator::FlagEvaluator;
/// use std::sync::Arc;
///
/// let source = StaticSource::from_json(r#"{
///     "services": {
///         "dpsm-api": {
///             "features": {
///                 "advancedSearch": {"enabled": true, "rolloutPercentage": 30}
///             }
///         }
///     }
/// }"#)
/// .unwrap();
/// let provider = SnapshotProvider::new(Arc::new(source)).unwrap();
/// let evaluator = FlagEvaluator::new(Arc::new(provider));
///
/// assert!(evaluator.is_feature_enabled("advancedSearch"));
/// assert!(!evaluator.is_feature_enabled("exportData"));
/// assert_eq!(evaluator.max_upload_size_mb(), 10);
///
/// let first = evaluator.is_feature_enabled_for_user("advancedSearch", "user-1").unwrap();
/// let second = evaluator.is_feature_enabled_for_user("advancedSearch", "user-1").unwrap();
/// assert_eq!(first, second);
/// ```
#[derive(Clone)]
pub struct FlagEvaluator {
    provider: Arc<dyn ConfigProvider>,
    namespace: Namespace,
}

impl FlagEvaluator {
    /// Creates an evaluator reading keys of the default application.
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        Self::with_namespace(provider, Namespace::default())
    }

    /// Creates an evaluator reading keys of `app_name`.
    pub fn for_app(provider: Arc<dyn ConfigProvider>, app_name: &str) -> Self {
        Self::with_namespace(provider, Namespace::for_app(app_name))
    }

    pub fn with_namespace(provider: Arc<dyn ConfigProvider>, namespace: Namespace) -> Self {
        Self {
            provider,
            namespace,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn provider(&self) -> &Arc<dyn ConfigProvider> {
        &self.provider
    }

    fn view(&self) -> View<'_> {
        match self.provider.snapshot() {
            Some(snapshot) => View::Pinned(snapshot),
            None => View::Live(self.provider.as_ref()),
        }
    }

    /// Returns whether a feature is globally enabled.
    ///
    /// An absent `enabled` key means disabled.
    pub fn is_feature_enabled(&self, feature_name: &str) -> bool {
        self.enabled_in(&self.view(), feature_name)
    }

    /// Returns whether a feature is enabled for one user.
    ///
    /// The global switch is checked first. An enabled feature is then rolled
    /// out to the users whose bucket is below the configured percentage
    /// (default 100).
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error when `user_id` is empty or only
    /// whitespace, whatever the state of the feature.
    pub fn is_feature_enabled_for_user(&self, feature_name: &str, user_id: &str) -> Result<bool> {
        validate_user_id(user_id)?;

        let view = self.view();
        if !self.enabled_in(&view, feature_name) {
            return Ok(false);
        }

        let rollout = self.rollout_in(&view, feature_name, DEFAULT_ROLLOUT_PERCENTAGE);
        let enabled = bucket::in_rollout(user_id, rollout);

        tracing::debug!(
            feature = feature_name,
            user = user_id,
            enabled,
            rollout,
            bucket = bucket::bucket(user_id),
            "Evaluated feature for user"
        );

        Ok(enabled)
    }

    /// Returns the configured rollout percentage of a feature (default 100).
    pub fn rollout_percentage(&self, feature_name: &str) -> i64 {
        self.rollout_in(&self.view(), feature_name, DEFAULT_ROLLOUT_PERCENTAGE)
    }

    /// Returns the status of a feature, or `None` if its `enabled` key is absent.
    ///
    /// An unconfigured rollout percentage is reported as `0` here.
    pub fn feature_status(&self, feature_name: &str) -> Option<FeatureStatus> {
        self.status_in(&self.view(), feature_name)
    }

    /// Returns the status of every feature that has an `enabled` key.
    pub fn features(&self) -> FeatureStatusMap {
        let view = self.view();
        let keys = view.keys();
        keys.iter()
            .filter_map(|key| self.namespace.feature_name_from_key(key))
            .filter_map(|name| {
                self.status_in(&view, name)
                    .map(|status| (name.to_string(), status))
            })
            .collect()
    }

    pub fn max_requests_per_minute(&self) -> i64 {
        self.limit_in(
            &self.view(),
            limits::MAX_REQUESTS_PER_MINUTE,
            limits::DEFAULT_MAX_REQUESTS_PER_MINUTE,
        )
    }

    pub fn max_upload_size_mb(&self) -> i64 {
        self.limit_in(
            &self.view(),
            limits::MAX_UPLOAD_SIZE_MB,
            limits::DEFAULT_MAX_UPLOAD_SIZE_MB,
        )
    }

    pub fn max_concurrent_requests(&self) -> i64 {
        self.limit_in(
            &self.view(),
            limits::MAX_CONCURRENT_REQUESTS,
            limits::DEFAULT_MAX_CONCURRENT_REQUESTS,
        )
    }

    pub fn request_timeout_seconds(&self) -> i64 {
        self.limit_in(
            &self.view(),
            limits::REQUEST_TIMEOUT_SECONDS,
            limits::DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.view()
            .get_bool(&self.namespace.cache_key(cache::ENABLED), cache::DEFAULT_ENABLED)
    }

    pub fn cache_ttl_seconds(&self) -> i64 {
        self.view().get_int(
            &self.namespace.cache_key(cache::TTL_SECONDS),
            cache::DEFAULT_TTL_SECONDS,
        )
    }

    pub fn cache_max_entries(&self) -> i64 {
        self.view().get_int(
            &self.namespace.cache_key(cache::MAX_ENTRIES),
            cache::DEFAULT_MAX_ENTRIES,
        )
    }

    /// All request limits, read from one snapshot.
    pub fn limits(&self) -> Limits {
        let view = self.view();
        Limits {
            max_requests_per_minute: self.limit_in(
                &view,
                limits::MAX_REQUESTS_PER_MINUTE,
                limits::DEFAULT_MAX_REQUESTS_PER_MINUTE,
            ),
            max_upload_size_mb: self.limit_in(
                &view,
                limits::MAX_UPLOAD_SIZE_MB,
                limits::DEFAULT_MAX_UPLOAD_SIZE_MB,
            ),
            max_concurrent_requests: self.limit_in(
                &view,
                limits::MAX_CONCURRENT_REQUESTS,
                limits::DEFAULT_MAX_CONCURRENT_REQUESTS,
            ),
            request_timeout_seconds: self.limit_in(
                &view,
                limits::REQUEST_TIMEOUT_SECONDS,
                limits::DEFAULT_REQUEST_TIMEOUT_SECONDS,
            ),
        }
    }

    /// All cache settings, read from one snapshot.
    pub fn cache_settings(&self) -> CacheSettings {
        let view = self.view();
        CacheSettings {
            enabled: view.get_bool(&self.namespace.cache_key(cache::ENABLED), cache::DEFAULT_ENABLED),
            ttl_seconds: view.get_int(
                &self.namespace.cache_key(cache::TTL_SECONDS),
                cache::DEFAULT_TTL_SECONDS,
            ),
            max_entries: view.get_int(
                &self.namespace.cache_key(cache::MAX_ENTRIES),
                cache::DEFAULT_MAX_ENTRIES,
            ),
        }
    }

    /// Returns a raw configuration entry, or `None` if the key is absent.
    pub fn config_value(&self, key: &str) -> Option<ConfigEntry> {
        match self.provider.snapshot() {
            Some(snapshot) => snapshot.get(key).map(|value| ConfigEntry {
                key: key.to_string(),
                value: value.clone(),
            }),
            None => self.provider.has_configuration(key).then(|| ConfigEntry {
                key: key.to_string(),
                value: self.provider.get_value(key, Value::Null),
            }),
        }
    }

    pub fn config_keys(&self) -> BTreeSet<String> {
        self.provider.keys()
    }

    pub fn config_stats(&self) -> ConfigStats {
        self.provider.stats()
    }

    pub fn config_version(&self) -> String {
        self.provider.current_version()
    }

    /// Asks the provider to reload its snapshot.
    ///
    /// # Errors
    ///
    /// Propagates the provider's refresh error. The previous snapshot keeps
    /// being served in that case.
    pub fn refresh(&self) -> Result<RefreshResponse> {
        self.provider.manual_refresh().map(RefreshResponse::from)
    }

    fn enabled_in(&self, view: &View<'_>, feature_name: &str) -> bool {
        let enabled = view.get_bool(
            &self.namespace.feature_key(feature_name, FeatureFacet::Enabled),
            false,
        );
        tracing::debug!(feature = feature_name, enabled, "Evaluated feature");
        enabled
    }

    fn rollout_in(&self, view: &View<'_>, feature_name: &str, default: i64) -> i64 {
        view.get_int(
            &self
                .namespace
                .feature_key(feature_name, FeatureFacet::RolloutPercentage),
            default,
        )
    }

    fn status_in(&self, view: &View<'_>, feature_name: &str) -> Option<FeatureStatus> {
        let enabled_key = self.namespace.feature_key(feature_name, FeatureFacet::Enabled);
        if !view.contains(&enabled_key) {
            return None;
        }
        Some(FeatureStatus {
            enabled: view.get_bool(&enabled_key, false),
            rollout_percentage: self.rollout_in(view, feature_name, DISCOVERY_ROLLOUT_PERCENTAGE),
        })
    }

    fn limit_in(&self, view: &View<'_>, limit_name: &str, default: i64) -> i64 {
        view.get_int(&self.namespace.limit_key(limit_name), default)
    }
}

impl std::fmt::Debug for FlagEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagEvaluator")
            .field("namespace", &self.namespace.prefix())
            .field("version", &self.provider.current_version())
            .finish()
    }
}

/// Rejects user identities that would all hash into one bucket.
fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(EvaluatorError::invalid_input(
            "User id must not be empty for per-user feature evaluation",
        ));
    }
    Ok(())
}
