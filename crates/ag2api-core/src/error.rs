//! Unified error types for ag2api core.

use ag2api_types::{ConfigError, TransformError};
use serde::Serialize;
use thiserror::Error;

/// Main error type for all core operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Response transformation failed.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Network request failed (HTTP client).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Logging could not be initialised.
    #[error("Logger error: {0}")]
    Logger(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for core operations.
pub type AppResult<T> = Result<T, AppError>;
