//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration loading or lookup error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid override '{0}' (expected path=value)")]
    InvalidOverride(String),

    #[error("config key not found: {0}")]
    KeyNotFound(String),

    #[error("config key {path} = '{value}' is not a valid {expected}")]
    InvalidValue {
        path: String,
        value: String,
        expected: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(path: &str, value: &str, expected: &'static str) -> Self {
        Self::InvalidValue {
            path: path.to_string(),
            value: value.to_string(),
            expected,
        }
    }

    /// Whether this error means the key is simply absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }
}
