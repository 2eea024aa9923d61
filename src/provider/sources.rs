//! Built-in configuration sources.

use super::ConfigSource;
use crate::error::{EvaluatorError, Result};
use crate::model::{ConfigSnapshot, ConfigValues};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// An in-memory source whose contents can be edited between refreshes.
///
/// Edits only become visible to readers once the owning provider refreshes.
#[derive(Debug, Default)]
pub struct StaticSource {
    values: RwLock<ConfigValues>,
}

impl StaticSource {
    pub fn new(values: ConfigValues) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Builds a source from a (possibly nested) JSON document.
    pub fn from_json(json_str: &str) -> Result<Self> {
        Ok(Self::new(ConfigSnapshot::parse_json(json_str)?))
    }

    /// Sets one key.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.write().insert(key.into(), value);
    }

    /// Removes one key.
    pub fn remove(&self, key: &str) {
        self.write().remove(key);
    }

    /// Replaces the whole contents.
    pub fn replace(&self, values: ConfigValues) {
        *self.write() = values;
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ConfigValues> {
        self.values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ConfigSource for StaticSource {
    fn load(&self) -> Result<ConfigValues> {
        let values = self
            .values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(values.clone())
    }

    fn name(&self) -> String {
        "static".to_string()
    }
}

/// A JSON or YAML file, re-read on every load.
///
/// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else as
/// JSON.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_yaml(&self) -> bool {
        matches!(
            self.path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        )
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<ConfigValues> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| EvaluatorError::source_error(&self.name(), e.to_string()))?;

        if self.is_yaml() {
            ConfigSnapshot::parse_yaml(&content)
        } else {
            ConfigSnapshot::parse_json(&content)
        }
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
