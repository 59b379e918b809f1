//! Response transformation errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the response transformers.
///
/// Malformed SSE events and redirect failures are recovered inside the
/// engine and never show up here.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum TransformError {
    /// A complete upstream JSON document could not be parsed
    #[error("Invalid upstream document: {message}")]
    InvalidDocument { message: String },

    /// The upstream body stream failed mid-flight
    #[error("Upstream stream aborted: {message}")]
    StreamAborted { message: String },

    /// A single SSE line exceeded the buffer limit
    #[error("SSE buffer overflow: line exceeded {limit_bytes} bytes")]
    BufferOverflow { limit_bytes: usize },

    /// The target document could not be serialized
    #[error("Serialization failed: {message}")]
    Serialization { message: String },
}

impl TransformError {
    /// Whether the error happened after bytes may already have reached the client.
    pub fn is_mid_stream(&self) -> bool {
        matches!(self, Self::StreamAborted { .. } | Self::BufferOverflow { .. })
    }
}

impl From<serde_json::Error> for TransformError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidDocument { message: e.to_string() }
    }
}
