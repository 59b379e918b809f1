//! Typed error definitions for ag2api.
//!
//! This module provides a structured error hierarchy with specific error types
//! for different domains. All errors are designed to be:
//!
//! - **Serializable** for diagnostics via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants

mod config;
mod transform;

pub use config::ConfigError;
pub use transform::TransformError;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = TransformError::StreamAborted { message: "connection reset".to_string() };

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("StreamAborted"));
        assert!(json.contains("connection reset"));

        let deserialized: TransformError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::Invalid {
            field: "redirect.timeout_secs".to_string(),
            message: "must be between 1 and 60".to_string(),
        };

        let msg = format!("{}", err);
        assert!(msg.contains("redirect.timeout_secs"));
        assert!(msg.contains("between 1 and 60"));
    }
}
