//! Capture replay through the response-out handler.

use ag2api_core::{
    transform_claude_response_out, OutBody, ResponseContext, TransformOptions, TransformServices,
    UpstreamResponse, UsageHolder,
};
use ag2api_types::GatewayConfig;
use anyhow::{bail, Context, Result};
use axum::http::StatusCode;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;

/// Upstream body to replay and how upstream delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayInput {
    pub body: Bytes,
    pub streaming: bool,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReplayRequest {
    pub override_model: Option<String>,
    pub max_context_tokens: Option<u32>,
}

impl ReplayInput {
    /// Accept either a raw-response capture document or a bare body.
    ///
    /// Bare bodies are SSE when they start with a `data:` line.
    pub fn from_file_bytes(raw: &[u8], force_stream: bool) -> Result<Self> {
        if let Ok(Value::Object(capture)) = serde_json::from_slice::<Value>(raw) {
            if let Some(raw_response) = capture.get("rawResponse") {
                let body = match raw_response {
                    Value::String(text) => Bytes::from(text.clone()),
                    other => Bytes::from(serde_json::to_vec(other)?),
                };
                let streaming = force_stream
                    || capture.get("streaming").and_then(Value::as_bool).unwrap_or(false);
                let model = capture.get("model").and_then(Value::as_str).map(str::to_string);
                return Ok(Self { body, streaming, model });
            }
        }

        let text = std::str::from_utf8(raw).context("body is not UTF-8")?;
        if text.trim().is_empty() {
            bail!("empty replay input");
        }
        let streaming = force_stream || text.trim_start().starts_with("data:");
        Ok(Self { body: Bytes::copy_from_slice(raw), streaming, model: None })
    }
}

/// Run one replay and return what the client would have received.
pub async fn run(input: ReplayInput, request: ReplayRequest, config: &GatewayConfig) -> Result<String> {
    let services = TransformServices::from_config(&config.transform.redirect)
        .map_err(anyhow::Error::msg)
        .context("building transform services")?;

    let holder = UsageHolder::new();
    let options = TransformOptions {
        override_model: request.override_model,
        max_context_tokens: request.max_context_tokens,
        usage_holder: Some(holder.clone()),
        ..TransformOptions::from_config(&config.transform)
    };

    let ctx = ResponseContext {
        request_id: format!("replay-{}", uuid::Uuid::new_v4()),
        model: input.model.clone().unwrap_or_default(),
        upstream_streaming: input.streaming,
        client_wants_stream: input.streaming,
    };

    let upstream = UpstreamResponse::from_bytes(StatusCode::OK, input.body);
    let out = transform_claude_response_out(upstream, &ctx, options, &services, config).await;

    let rendered = match out.body {
        OutBody::Sse(mut stream) => {
            let mut text = String::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.context("transformed stream failed")?;
                text.push_str(&String::from_utf8_lossy(&chunk));
            }
            text
        },
        OutBody::Full(bytes) => match serde_json::from_slice::<Value>(&bytes) {
            Ok(json) => format!("{}\n", serde_json::to_string_pretty(&json)?),
            Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
        },
        OutBody::Passthrough(_) => bail!("upstream status {} passed through", out.status),
    };

    if !out.status.is_success() {
        bail!("transformation failed with status {}: {}", out.status, rendered.trim());
    }

    let report = holder.report();
    tracing::info!(
        model = %report.model,
        input_tokens = report.usage.map(|u| u.input_tokens),
        output_tokens = report.usage.map(|u| u.output_tokens),
        "[Replay] Completed"
    );

    Ok(rendered)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DOC: &str = r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":3,"candidatesTokenCount":1,"totalTokenCount":4}}"#;
    const SSE: &str = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"hi\"}]},\"finishReason\":\"STOP\"}]}\n\n";

    fn offline_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.transform.redirect.enabled = false;
        config
    }

    #[test]
    fn test_capture_document_is_unwrapped() {
        let capture = serde_json::json!({
            "timestamp": "2026-01-01T00:00:00Z",
            "requestId": "r",
            "model": "claude-sonnet-4-5",
            "streaming": true,
            "httpStatus": 200,
            "rawResponse": SSE,
        });
        let input = ReplayInput::from_file_bytes(capture.to_string().as_bytes(), false).unwrap();
        assert!(input.streaming);
        assert_eq!(input.model.as_deref(), Some("claude-sonnet-4-5"));
        assert_eq!(&input.body[..], SSE.as_bytes());
    }

    #[test]
    fn test_bare_bodies_are_sniffed() {
        assert!(ReplayInput::from_file_bytes(SSE.as_bytes(), false).unwrap().streaming);
        assert!(!ReplayInput::from_file_bytes(DOC.as_bytes(), false).unwrap().streaming);
        assert!(ReplayInput::from_file_bytes(DOC.as_bytes(), true).unwrap().streaming);
        assert!(ReplayInput::from_file_bytes(b"   ", false).is_err());
    }

    #[tokio::test]
    async fn test_replay_document() {
        let input = ReplayInput::from_file_bytes(DOC.as_bytes(), false).unwrap();
        let request = ReplayRequest { override_model: Some("claude-x".to_string()), max_context_tokens: None };
        let out = run(input, request, &offline_config()).await.unwrap();
        let message: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(message["model"], "claude-x");
        assert_eq!(message["content"][0]["text"], "hi");
    }

    #[tokio::test]
    async fn test_replay_stream() {
        let input = ReplayInput::from_file_bytes(SSE.as_bytes(), false).unwrap();
        let out = run(input, ReplayRequest::default(), &offline_config()).await.unwrap();
        assert!(out.starts_with("event: message_start\n"));
        assert!(out.contains(r#""text":"hi""#));
        assert!(out.contains("event: message_stop\n"));
    }
}
