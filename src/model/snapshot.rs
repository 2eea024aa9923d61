//! Immutable configuration snapshots.

use crate::error::{EvaluatorError, Result};
use serde_json::{Number, Value};
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

/// Flat key/value pairs making up one configuration generation.
pub type ConfigValues = HashMap<String, Value>;

/// A point-in-time view of all configuration key/value pairs.
///
/// Snapshots are never mutated after construction. A provider publishes a new
/// generation by building a fresh snapshot and swapping it in.
///
/// # Example
///
/// ```
/// use appconfig_evaluator::model::ConfigSnapshot;
///
/// let values = ConfigSnapshot::parse_yaml(
///     "services:\n  dpsm-api:\n    limits:\n      maxUploadSizeMB: 25\n",
/// )
/// .unwrap();
/// let snapshot = ConfigSnapshot::new(values, 1);
/// assert_eq!(snapshot.get_int("services.dpsm-api.limits.maxUploadSizeMB", 10), 25);
/// assert_eq!(snapshot.get_int("services.dpsm-api.limits.missing", 10), 10);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    values: ConfigValues,
    generation: u64,
    refreshed_at: u64,
}

impl ConfigSnapshot {
    /// Creates a snapshot stamped with the current time.
    pub fn new(values: ConfigValues, generation: u64) -> Self {
        Self::with_timestamp(values, generation, crate::get_current_time())
    }

    /// Creates a snapshot with an explicit refresh timestamp (unix seconds).
    pub fn with_timestamp(values: ConfigValues, generation: u64, refreshed_at: u64) -> Self {
        Self {
            values,
            generation,
            refreshed_at,
        }
    }

    /// The empty generation a provider starts from before its first load.
    pub fn empty() -> Self {
        Self::with_timestamp(ConfigValues::new(), 0, 0)
    }

    /// Parses a JSON document into flat dotted keys.
    pub fn parse_json(json_str: &str) -> Result<ConfigValues> {
        let document: Value = serde_json::from_str(json_str)
            .map_err(|e| EvaluatorError::parse_error(format!("Failed to parse JSON: {}", e)))?;
        Self::flatten_document(document)
    }

    /// Parses a YAML document into flat dotted keys.
    pub fn parse_yaml(yaml_str: &str) -> Result<ConfigValues> {
        let document: Value = serde_yaml::from_str(yaml_str)
            .map_err(|e| EvaluatorError::parse_error(format!("Failed to parse YAML: {}", e)))?;
        Self::flatten_document(document)
    }

    /// Flattens a nested document so that `{"a": {"b": 1}}` becomes `a.b = 1`.
    ///
    /// Keys that already contain dots are kept as written. Arrays are leaves.
    /// A dotted key that collides with a nested path (`{"a.b": 1, "a": {"b": 2}}`)
    /// is a parse error.
    pub fn flatten_document(document: Value) -> Result<ConfigValues> {
        let Value::Object(root) = document else {
            return Err(EvaluatorError::parse_error(
                "Configuration document must be a mapping at the top level",
            ));
        };

        let mut values = ConfigValues::new();
        let mut pending: Vec<(String, Value)> = root.into_iter().collect();
        while let Some((path, value)) = pending.pop() {
            match value {
                Value::Object(children) if !children.is_empty() => {
                    for (child, nested) in children {
                        pending.push((format!("{}.{}", path, child), nested));
                    }
                }
                leaf => match values.entry(path) {
                    Entry::Occupied(entry) => {
                        return Err(EvaluatorError::parse_error(format!(
                            "Duplicate configuration key: {}",
                            entry.key()
                        )));
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(leaf);
                    }
                },
            }
        }
        Ok(values)
    }

    /// Generation counter, starting at `1` for the first loaded snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Unix timestamp (seconds) at which this snapshot was built.
    pub fn refreshed_at(&self) -> u64 {
        self.refreshed_at
    }

    /// Number of keys in the snapshot.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> BTreeSet<String> {
        self.values.keys().cloned().collect()
    }

    /// Reads a boolean, accepting JSON booleans and `"true"`/`"false"` strings.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => default,
            },
            _ => default,
        }
    }

    /// Reads an integer, accepting integral numbers and numeric strings.
    ///
    /// Whole-number floats such as `30.0` count as integers. Fractional values
    /// fall back to `default`.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            Some(Value::Number(n)) => integral(n).unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// Reads a string. Numbers and booleans are rendered as text.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => default.to_string(),
        }
    }

    /// Returns the sorted keys that were added, removed or changed relative to
    /// `previous`.
    pub fn diff_keys(&self, previous: &ConfigSnapshot) -> Vec<String> {
        let mut changed: BTreeSet<&String> = BTreeSet::new();

        for (key, value) in &self.values {
            if previous.values.get(key) != Some(value) {
                changed.insert(key);
            }
        }
        for key in previous.values.keys() {
            if !self.values.contains_key(key) {
                changed.insert(key);
            }
        }

        changed.into_iter().cloned().collect()
    }
}

/// Converts a JSON number to `i64` when it holds a whole value in range.
fn integral(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    // 2^63 is exactly representable, so the upper bound is exclusive.
    n.as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
        .map(|f| f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(document: Value) -> ConfigSnapshot {
        ConfigSnapshot::with_timestamp(ConfigSnapshot::flatten_document(document).unwrap(), 1, 0)
    }

    #[test]
    fn test_flatten_nested_document() {
        let values = ConfigSnapshot::flatten_document(json!({
            "services": {
                "dpsm-api": {
                    "features": {"advancedSearch": {"enabled": true, "rolloutPercentage": 30}},
                    "limits": {"maxUploadSizeMB": 25}
                }
            }
        }))
        .unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(
            values["services.dpsm-api.features.advancedSearch.enabled"],
            json!(true)
        );
        assert_eq!(
            values["services.dpsm-api.features.advancedSearch.rolloutPercentage"],
            json!(30)
        );
        assert_eq!(values["services.dpsm-api.limits.maxUploadSizeMB"], json!(25));
    }

    #[test]
    fn test_flatten_keeps_dotted_keys_and_arrays() {
        let values = ConfigSnapshot::flatten_document(json!({
            "services.dpsm-api.cache.enabled": false,
            "allowlist": ["a", "b"],
            "empty": {}
        }))
        .unwrap();

        assert_eq!(values["services.dpsm-api.cache.enabled"], json!(false));
        assert_eq!(values["allowlist"], json!(["a", "b"]));
        assert_eq!(values["empty"], json!({}));
    }

    #[test]
    fn test_flatten_rejects_non_mapping() {
        let err = ConfigSnapshot::flatten_document(json!([1, 2])).unwrap_err();
        assert_eq!(err.error_type, crate::error::ErrorType::ParseError);
    }

    #[test]
    fn test_parse_invalid_documents() {
        assert!(ConfigSnapshot::parse_json("not valid json")
            .unwrap_err()
            .message
            .contains("Failed to parse JSON"));
        assert!(ConfigSnapshot::parse_yaml("a: [unclosed")
            .unwrap_err()
            .message
            .contains("Failed to parse YAML"));
    }

    #[test]
    fn test_parse_yaml_matches_json() {
        let from_yaml = ConfigSnapshot::parse_yaml(
            "services:\n  app:\n    cache:\n      enabled: true\n      ttlSeconds: 60\n",
        )
        .unwrap();
        let from_json = ConfigSnapshot::parse_json(
            r#"{"services": {"app": {"cache": {"enabled": true, "ttlSeconds": 60}}}}"#,
        )
        .unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn test_typed_lookups_coerce_strings() {
        let snap = snapshot(json!({
            "flag": "TRUE",
            "off": "false",
            "weird": "yes",
            "count": "42",
            "bad": "forty-two",
            "float": 1.5,
            "num": 7
        }));

        assert!(snap.get_bool("flag", false));
        assert!(!snap.get_bool("off", true));
        assert!(snap.get_bool("weird", true));
        assert_eq!(snap.get_int("count", 0), 42);
        assert_eq!(snap.get_int("bad", 9), 9);
        assert_eq!(snap.get_int("float", 9), 9);
        assert_eq!(snap.get_string("num", ""), "7");
        assert_eq!(snap.get_string("missing", "fallback"), "fallback");
    }

    #[test]
    fn test_int_lookup_accepts_whole_floats() {
        let snap = snapshot(json!({
            "zero": 0.0,
            "thirty": 30.0,
            "negative": -10.0,
            "half": 1.5,
            "huge": 1e300
        }));

        assert_eq!(snap.get_int("zero", 100), 0);
        assert_eq!(snap.get_int("thirty", 100), 30);
        assert_eq!(snap.get_int("negative", 100), -10);
        assert_eq!(snap.get_int("half", 9), 9);
        assert_eq!(snap.get_int("huge", 9), 9);
    }

    #[test]
    fn test_int_lookup_accepts_whole_floats_from_yaml() {
        let values = ConfigSnapshot::parse_yaml("limits:\n  maxUploadSizeMB: 25.0\n").unwrap();
        let snap = ConfigSnapshot::with_timestamp(values, 1, 0);
        assert_eq!(snap.get_int("limits.maxUploadSizeMB", 10), 25);
    }

    #[test]
    fn test_flatten_rejects_colliding_keys() {
        let err = ConfigSnapshot::flatten_document(json!({"a.b": 1, "a": {"b": 2}})).unwrap_err();
        assert_eq!(err.error_type, crate::error::ErrorType::ParseError);
        assert!(err.message.contains("a.b"));

        let err = ConfigSnapshot::parse_json(r#"{"a": {"b.c": 1, "b": {"c": 2}}}"#).unwrap_err();
        assert_eq!(err.error_type, crate::error::ErrorType::ParseError);
    }

    #[test]
    fn test_typed_lookups_fall_back_on_type_mismatch() {
        let snap = snapshot(json!({"list": [1, 2], "flag": 1}));
        assert!(!snap.get_bool("flag", false));
        assert_eq!(snap.get_int("list", 5), 5);
    }

    #[test]
    fn test_diff_keys() {
        let old = snapshot(json!({"a": 1, "b": 2, "c": 3}));
        let new = snapshot(json!({"a": 1, "b": 20, "d": 4}));
        assert_eq!(new.diff_keys(&old), vec!["b", "c", "d"]);
        assert!(new.diff_keys(&new).is_empty());
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = ConfigSnapshot::empty();
        assert!(snap.is_empty());
        assert_eq!(snap.generation(), 0);
        assert!(snap.keys().is_empty());
    }
}
