//! Error types for the appconfig-evaluator library.
//!
//! Absent configuration is never an error: every lookup resolves to its
//! default. The errors here cover the remaining cases, which are malformed
//! configuration documents, failing configuration sources and invalid caller
//! input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The type of error that occurred.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Error parsing a configuration document
    ParseError,
    /// Invalid input provided by the caller
    InvalidInput,
    /// The configuration source could not produce a snapshot
    SourceError,
    /// A requested key or feature is not present in the snapshot
    KeyNotFound,
}

/// Represents an error raised by a provider, a source or the evaluator.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{error_type:?}: {message}")]
pub struct EvaluatorError {
    /// Human-readable error message
    pub message: String,
    /// Type classification of the error
    pub error_type: ErrorType,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EvaluatorError>;

impl EvaluatorError {
    /// Creates a new parse error.
    ///
    /// # Example
    /// ```
    /// use appconfig_evaluator::error::{ErrorType, EvaluatorError};
    /// let err = EvaluatorError::parse_error("Invalid YAML syntax");
    /// assert_eq!(err.error_type, ErrorType::ParseError);
    /// ```
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::ParseError,
        }
    }

    /// Creates a new invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::InvalidInput,
        }
    }

    /// Creates a new source error.
    ///
    /// # Arguments
    /// * `source` - Name of the configuration source that failed
    /// * `message` - Description of the failure
    pub fn source_error(source: &str, message: impl Into<String>) -> Self {
        Self {
            message: format!("{}: {}", source, message.into()),
            error_type: ErrorType::SourceError,
        }
    }

    /// Creates a new key not found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self {
            message: format!("Configuration not found: {}", key.into()),
            error_type: ErrorType::KeyNotFound,
        }
    }

    /// Converts the error to a JSON string.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error_type":{},"message":"{}"}}"#,
                serde_json::to_string(&self.error_type).unwrap_or_default(),
                self.message
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = EvaluatorError::parse_error("test error");
        assert_eq!(err.error_type, ErrorType::ParseError);
        assert_eq!(err.message, "test error");
    }

    #[test]
    fn test_error_display() {
        let err = EvaluatorError::invalid_input("user id must not be empty");
        let display = format!("{}", err);
        assert!(display.contains("user id must not be empty"));
        assert!(display.contains("InvalidInput"));
    }

    #[test]
    fn test_source_error_names_source() {
        let err = EvaluatorError::source_error("file:app.yaml", "permission denied");
        assert_eq!(err.error_type, ErrorType::SourceError);
        assert_eq!(err.message, "file:app.yaml: permission denied");
    }

    #[test]
    fn test_key_not_found_error() {
        let err = EvaluatorError::key_not_found("services.dpsm-api.limits.x");
        assert_eq!(err.error_type, ErrorType::KeyNotFound);
        assert!(err.message.contains("services.dpsm-api.limits.x"));
    }

    #[test]
    fn test_error_to_json() {
        let err = EvaluatorError::parse_error("test");
        let json = err.to_json_string();
        assert!(json.contains("parse_error"));
        assert!(json.contains("test"));
    }
}
