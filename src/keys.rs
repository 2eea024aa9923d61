//! Configuration key naming convention.
//!
//! Every key the evaluator reads is built here. Keys live in a flat, dotted
//! namespace rooted at `services.<app-name>`:
//!
//! ```text
//! services.<app>.features.<name>.enabled
//! services.<app>.features.<name>.rolloutPercentage
//! services.<app>.limits.<name>
//! services.<app>.cache.<name>
//! ```

/// Application name used when none is configured.
pub const DEFAULT_APP_NAME: &str = "dpsm-api";

const SERVICES_ROOT: &str = "services";
const FEATURES_SEGMENT: &str = "features";
const LIMITS_SEGMENT: &str = "limits";
const CACHE_SEGMENT: &str = "cache";

/// Limit names under `<prefix>.limits`.
pub mod limits {
    pub const MAX_REQUESTS_PER_MINUTE: &str = "maxRequestsPerMinute";
    pub const MAX_UPLOAD_SIZE_MB: &str = "maxUploadSizeMB";
    pub const MAX_CONCURRENT_REQUESTS: &str = "maxConcurrentRequests";
    pub const REQUEST_TIMEOUT_SECONDS: &str = "requestTimeoutSeconds";

    pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: i64 = 1000;
    pub const DEFAULT_MAX_UPLOAD_SIZE_MB: i64 = 10;
    pub const DEFAULT_MAX_CONCURRENT_REQUESTS: i64 = 100;
    pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: i64 = 30;
}

/// Cache setting names under `<prefix>.cache`.
pub mod cache {
    pub const ENABLED: &str = "enabled";
    pub const TTL_SECONDS: &str = "ttlSeconds";
    pub const MAX_ENTRIES: &str = "maxEntries";

    pub const DEFAULT_ENABLED: bool = true;
    pub const DEFAULT_TTL_SECONDS: i64 = 300;
    pub const DEFAULT_MAX_ENTRIES: i64 = 1000;
}

/// The two observable facets of a feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFacet {
    Enabled,
    RolloutPercentage,
}

impl FeatureFacet {
    /// The key suffix carrying this facet.
    pub fn suffix(self) -> &'static str {
        match self {
            FeatureFacet::Enabled => "enabled",
            FeatureFacet::RolloutPercentage => "rolloutPercentage",
        }
    }
}

/// Builds a configuration key from a prefix, a name and a suffix.
///
/// Empty segments are skipped so that `config_key(p, n, "")` yields `p.n`.
///
/// # Example
///
/// ```
/// use appconfig_evaluator::keys::config_key;
///
/// assert_eq!(
///     config_key("services.dpsm-api.features", "advancedSearch", "enabled"),
///     "services.dpsm-api.features.advancedSearch.enabled"
/// );
/// ```
pub fn config_key(prefix: &str, name: &str, suffix: &str) -> String {
    [prefix, name, suffix]
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

/// The `services.<app>` prefix every key of one application shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    prefix: String,
}

impl Namespace {
    /// Creates the namespace for the given application name.
    pub fn for_app(app_name: &str) -> Self {
        Self {
            prefix: config_key(SERVICES_ROOT, app_name, ""),
        }
    }

    /// Returns the `services.<app>` prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns `<prefix>.features.<name>`, the root of one feature's facets.
    pub fn feature_root(&self, feature_name: &str) -> String {
        config_key(&self.section(FEATURES_SEGMENT), feature_name, "")
    }

    /// Returns the key of one facet of a feature.
    pub fn feature_key(&self, feature_name: &str, facet: FeatureFacet) -> String {
        config_key(&self.section(FEATURES_SEGMENT), feature_name, facet.suffix())
    }

    /// Returns `<prefix>.limits.<name>`.
    pub fn limit_key(&self, limit_name: &str) -> String {
        config_key(&self.section(LIMITS_SEGMENT), limit_name, "")
    }

    /// Returns `<prefix>.cache.<name>`.
    pub fn cache_key(&self, setting_name: &str) -> String {
        config_key(&self.section(CACHE_SEGMENT), setting_name, "")
    }

    /// Extracts the feature name from a `<prefix>.features.<name>.enabled` key.
    ///
    /// Returns `None` for every other key shape, including keys of other
    /// applications.
    pub fn feature_name_from_key<'k>(&self, key: &'k str) -> Option<&'k str> {
        let features = self.section(FEATURES_SEGMENT);
        let rest = key.strip_prefix(features.as_str())?.strip_prefix('.')?;
        let name = rest
            .strip_suffix(FeatureFacet::Enabled.suffix())?
            .strip_suffix('.')?;
        (!name.is_empty()).then_some(name)
    }

    fn section(&self, segment: &str) -> String {
        config_key(&self.prefix, segment, "")
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::for_app(DEFAULT_APP_NAME)
    }
}
