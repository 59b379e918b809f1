//! Gateway configuration models.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// URL prefix of the opaque grounding redirects the upstream hands out.
pub const DEFAULT_REDIRECT_PREFIX: &str =
    "https://vertexaisearch.cloud.google.com/grounding-api-redirect/";

// ============================================================================
// Root
// ============================================================================

/// Full gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct GatewayConfig {
    /// Log raw upstream bodies at debug level
    #[serde(default)]
    pub debug: bool,
    /// Save raw upstream bodies to `<log dir>/raw_response_*.json`
    #[serde(default)]
    pub debug_raw_response: bool,
    /// Logging configuration
    #[serde(default)]
    #[validate(nested)]
    pub log: LogConfig,
    /// Response transformation configuration
    #[serde(default)]
    #[validate(nested)]
    pub transform: TransformConfig,
}

// ============================================================================
// Logging
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily-rolling log files; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Days to keep rolled log files (0 keeps everything)
    #[validate(range(max = 3650_u32))]
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_retention_days() -> u32 {
    3
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level(), dir: None, retention_days: default_retention_days() }
    }
}

// ============================================================================
// Transformation
// ============================================================================

/// Response transformation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct TransformConfig {
    /// Turn `<tool>json</tool>` answer text into tool_use blocks
    #[serde(default)]
    pub mcp_xml_enabled: bool,
    /// Drop stray signatures from responses that contain no thinking
    #[serde(default = "default_true")]
    pub drop_orphan_signatures: bool,
    /// Grounding redirect resolution
    #[serde(default)]
    #[validate(nested)]
    pub redirect: RedirectConfig,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            mcp_xml_enabled: false,
            drop_orphan_signatures: true,
            redirect: RedirectConfig::default(),
        }
    }
}

/// Grounding redirect resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct RedirectConfig {
    /// Resolve redirect URLs at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Budget for one whole redirect chain, in seconds
    #[validate(range(min = 1_u64, max = 60_u64))]
    #[serde(default = "default_redirect_timeout")]
    pub timeout_secs: u64,
    /// Maximum redirects followed per URL
    #[validate(range(min = 1_u32, max = 20_u32))]
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
    /// Cache size above which the resolved-URL cache is cleared
    #[validate(range(min = 1_usize))]
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Only URLs starting with this prefix are resolved
    #[validate(url)]
    #[serde(default = "default_redirect_prefix")]
    pub redirect_prefix: String,
    /// Outbound proxy for resolution requests (http/https/socks5)
    #[validate(url)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

fn default_redirect_timeout() -> u64 {
    5
}

fn default_max_hops() -> u32 {
    5
}

fn default_cache_capacity() -> usize {
    2000
}

fn default_redirect_prefix() -> String {
    DEFAULT_REDIRECT_PREFIX.to_string()
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_redirect_timeout(),
            max_hops: default_max_hops(),
            cache_capacity: default_cache_capacity(),
            redirect_prefix: default_redirect_prefix(),
            proxy_url: None,
        }
    }
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.retention_days, 3);
        assert!(config.transform.drop_orphan_signatures);
        assert!(!config.transform.mcp_xml_enabled);
        assert_eq!(config.transform.redirect.timeout_secs, 5);
        assert_eq!(config.transform.redirect.max_hops, 5);
        assert_eq!(config.transform.redirect.cache_capacity, 2000);
        assert_eq!(config.transform.redirect.redirect_prefix, DEFAULT_REDIRECT_PREFIX);
    }

    #[test]
    fn test_defaults_validate() {
        assert!(GatewayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_nested_document() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"transform": {"redirect": {"timeout_secs": 9}}}"#).unwrap();
        assert_eq!(config.transform.redirect.timeout_secs, 9);
        assert_eq!(config.transform.redirect.max_hops, 5);
        assert!(config.transform.redirect.enabled);
    }

    #[test]
    fn test_out_of_range_timeout_rejected() {
        let mut config = GatewayConfig::default();
        config.transform.redirect.timeout_secs = 0;
        assert!(config.validate().is_err());
        config.transform.redirect.timeout_secs = 61;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_proxy_url_rejected() {
        let mut config = GatewayConfig::default();
        config.transform.redirect.proxy_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
        config.transform.redirect.proxy_url = Some("socks5://127.0.0.1:1080".to_string());
        assert!(config.validate().is_ok());
    }
}
