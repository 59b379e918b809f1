//! Side-channel taps on the raw upstream body.

use std::path::{Path, PathBuf};

use ag2api_types::GatewayConfig;
use serde_json::{json, Value};

use super::response_handler::ResponseContext;
use crate::proxy::upstream::{SideCapture, SideCursor};

/// What one side cursor is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TapKind {
    Log,
    RawFile,
}

/// Taps requested by the configuration, one side cursor each.
pub(super) fn requested_taps(config: &GatewayConfig) -> Vec<TapKind> {
    let mut taps = Vec::new();
    if config.debug {
        taps.push(TapKind::Log);
    }
    if config.debug_raw_response {
        taps.push(TapKind::RawFile);
    }
    taps
}

/// Spawn one background reader per tap. Readers never block the primary body.
pub(super) fn spawn_taps(
    taps: &[TapKind],
    cursors: Vec<SideCursor>,
    ctx: &ResponseContext,
    http_status: u16,
    log_dir: Option<PathBuf>,
) {
    for (kind, cursor) in taps.iter().copied().zip(cursors) {
        let ctx = ctx.clone();
        let log_dir = log_dir.clone();
        tokio::spawn(async move {
            let capture = cursor.read_to_end().await;
            match kind {
                TapKind::Log => log_capture(&ctx, http_status, &capture),
                TapKind::RawFile => {
                    let Some(dir) = log_dir else {
                        tracing::warn!("[DebugTap] debug_raw_response is on but no log dir is configured");
                        return;
                    };
                    let raw = String::from_utf8_lossy(&capture.body);
                    match save_raw_response(&dir, &ctx, http_status, &raw).await {
                        Ok(path) => tracing::debug!("[DebugTap] Raw response saved to {}", path.display()),
                        Err(e) => tracing::warn!("[DebugTap] Failed to save raw response: {}", e),
                    }
                },
            }
        });
    }
}

pub(super) fn log_capture(ctx: &ResponseContext, http_status: u16, capture: &SideCapture) {
    tracing::debug!(
        request_id = %ctx.request_id,
        model = %ctx.model,
        http_status,
        complete = capture.complete,
        "[DebugTap] Raw upstream body ({} bytes): {}",
        capture.body.len(),
        String::from_utf8_lossy(&capture.body)
    );
}

/// Write `raw_response_<timestamp>_<request id>.json` into `dir`.
///
/// JSON bodies are embedded as JSON, anything else (SSE text) as a string.
pub async fn save_raw_response(
    dir: &Path,
    ctx: &ResponseContext,
    http_status: u16,
    raw: &str,
) -> std::io::Result<PathBuf> {
    let now = chrono::Utc::now();
    let raw_response =
        serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    let document = json!({
        "timestamp": now.to_rfc3339(),
        "requestId": ctx.request_id,
        "model": ctx.model,
        "streaming": ctx.upstream_streaming,
        "httpStatus": http_status,
        "rawResponse": raw_response,
    });

    tokio::fs::create_dir_all(dir).await?;
    let file_name = format!(
        "raw_response_{}_{}.json",
        now.format("%Y%m%d_%H%M%S%3f"),
        sanitize_file_component(&ctx.request_id)
    );
    let path = dir.join(file_name);
    let bytes = serde_json::to_vec_pretty(&document)?;
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

fn sanitize_file_component(raw: &str) -> String {
    raw.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
}
