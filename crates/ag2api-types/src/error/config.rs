//! Configuration-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// Config file exists but could not be read
    #[error("Config read error for {path}: {message}")]
    Unreadable {
        /// Filesystem path of the config file
        path: String,
        /// Description of the I/O failure
        message: String,
    },

    /// Config file parse error (JSON)
    #[error("Config parse error: {message}")]
    Malformed {
        /// Description of the parse failure
        message: String,
    },

    /// Config validation error (invalid values)
    #[error("Config validation error for {field}: {message}")]
    Invalid {
        /// Name of the field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },
}

impl ConfigError {
    /// Create a parse error from a serde_json error.
    pub fn from_json_error(e: &serde_json::Error) -> Self {
        Self::Malformed { message: e.to_string() }
    }

    /// Create a read error from an IO error.
    pub fn from_io_error(path: &str, e: &std::io::Error) -> Self {
        Self::Unreadable { path: path.to_string(), message: e.to_string() }
    }
}
