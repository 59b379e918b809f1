//! Configuration loading: optional JSON file, then `AG2API_*` environment
//! overrides, then validation.

use std::fs;
use std::path::{Path, PathBuf};

use ag2api_types::{ConfigError, GatewayConfig};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Load the gateway configuration. A missing file yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) if path.exists() => read_config_file(path)?,
        Some(path) => {
            tracing::info!("[Config] {} not found, using defaults", path.display());
            GatewayConfig::default()
        },
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::from_io_error(&display, &e))?;
    serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))
}

/// Apply `AG2API_*` overrides. Unparsable values are ignored with a warning.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let flag = |key: &str| {
        let raw = lookup(key)?;
        let parsed = parse_bool(&raw);
        if parsed.is_none() {
            tracing::warn!("[Config] Ignoring {}={:?}: not a boolean", key, raw);
        }
        parsed
    };

    if let Some(v) = flag("AG2API_DEBUG") {
        config.debug = v;
    }
    if let Some(v) = flag("AG2API_DEBUG_RAW_RESPONSE") {
        config.debug_raw_response = v;
    }
    if let Some(v) = flag("AG2API_MCP_XML") {
        config.transform.mcp_xml_enabled = v;
    }
    if let Some(v) = flag("AG2API_DROP_ORPHAN_SIGNATURES") {
        config.transform.drop_orphan_signatures = v;
    }

    if let Some(level) = lookup("AG2API_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
        config.log.level = level.trim().to_string();
    }
    if let Some(dir) = lookup("AG2API_LOG_DIR").filter(|v| !v.trim().is_empty()) {
        config.log.dir = Some(PathBuf::from(dir.trim()));
    }
    if let Some(raw) = lookup("AG2API_LOG_RETENTION_DAYS") {
        match raw.trim().parse() {
            Ok(days) => config.log.retention_days = days,
            Err(_) => tracing::warn!("[Config] Ignoring AG2API_LOG_RETENTION_DAYS={:?}", raw),
        }
    }
    if let Some(raw) = lookup("AG2API_REDIRECT_TIMEOUT_SECS") {
        match raw.trim().parse() {
            Ok(secs) => config.transform.redirect.timeout_secs = secs,
            Err(_) => tracing::warn!("[Config] Ignoring AG2API_REDIRECT_TIMEOUT_SECS={:?}", raw),
        }
    }
    if let Some(url) = lookup("AG2API_PROXY_URL") {
        let url = url.trim();
        config.transform.redirect.proxy_url = (!url.is_empty()).then(|| url.to_string());
    }
}

/// `1/true/yes/y/on` and `0/false/no/n/off`, case-insensitive.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn validate_config(config: &GatewayConfig) -> Result<(), ConfigError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_violation(&errors, "")
            .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
        ConfigError::Invalid { field, message }
    })
}

/// Dotted path and message of the first failing field.
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() { field.to_string() } else { format!("{}.{}", prefix, field) };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| format!("failed '{}' check", err.code));
                    return Some((path, message));
                }
            },
            ValidationErrorsKind::Struct(nested) => {
                if let Some(found) = first_violation(nested, &path) {
                    return Some(found);
                }
            },
            ValidationErrorsKind::List(items) => {
                if let Some(found) = items.values().find_map(|nested| first_violation(nested, &path)) {
                    return Some(found);
                }
            },
        }
    }
    None
}
