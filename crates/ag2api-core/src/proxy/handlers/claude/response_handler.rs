//! Response handling for streaming and non-streaming Claude responses

use std::pin::Pin;

use ag2api_types::protocol::ClaudeResponse;
use ag2api_types::{GatewayConfig, TransformError};
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::Stream;
use serde_json::json;

use super::debug_taps::{log_capture, requested_taps, spawn_taps};
use crate::proxy::mappers::claude::{
    collect_stream_to_json, create_claude_sse_stream, transform_response_body, TransformOptions,
};
use crate::proxy::services::TransformServices;
use crate::proxy::upstream::{fan_out, BodyStream, SideCapture, UpstreamResponse};

/// Per-request facts the response side needs.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    pub request_id: String,
    /// Model the client asked for; used in logs and raw captures.
    pub model: String,
    /// Upstream was asked for SSE.
    pub upstream_streaming: bool,
    /// Client asked for SSE. When upstream streams but the client does not,
    /// the stream is collected back into one document.
    pub client_wants_stream: bool,
}

pub enum OutBody {
    /// Upstream body forwarded untouched.
    Passthrough(BodyStream),
    /// Transformed Claude SSE.
    Sse(Pin<Box<dyn Stream<Item = Result<Bytes, TransformError>> + Send>>),
    /// Complete document.
    Full(Bytes),
}

/// What goes back to the client.
pub struct ClaudeResponseOut {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: OutBody,
}

impl std::fmt::Debug for ClaudeResponseOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = match &self.body {
            OutBody::Passthrough(_) => "passthrough",
            OutBody::Sse(_) => "sse",
            OutBody::Full(_) => "full",
        };
        f.debug_struct("ClaudeResponseOut")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &body)
            .finish()
    }
}

impl IntoResponse for ClaudeResponseOut {
    fn into_response(self) -> Response {
        let body = match self.body {
            OutBody::Passthrough(stream) => Body::from_stream(stream),
            OutBody::Sse(stream) => Body::from_stream(stream),
            OutBody::Full(bytes) => Body::from(bytes),
        };
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Turn an upstream call result into the client response.
///
/// - upstream failure: status, headers and body passed through, minus
///   `content-encoding` and `content-length`
/// - upstream SSE: transformed live, or collected into JSON when the client
///   asked for a document
/// - upstream JSON: transformed into one Claude message
pub async fn transform_claude_response_out(
    upstream: UpstreamResponse,
    ctx: &ResponseContext,
    options: TransformOptions,
    services: &TransformServices,
    config: &GatewayConfig,
) -> ClaudeResponseOut {
    let UpstreamResponse { ok, status, headers, body } = upstream;

    if !ok {
        return passthrough(status, headers, body, ctx, config).await;
    }

    let taps = requested_taps(config);
    let body = body.unwrap_or_else(|| Box::pin(futures::stream::empty()));
    let (body, cursors) = fan_out(body, taps.len());
    spawn_taps(&taps, cursors, ctx, status.as_u16(), config.log.dir.clone());

    if ctx.upstream_streaming {
        let sse = create_claude_sse_stream(body, options, services.clone());
        if ctx.client_wants_stream {
            tracing::debug!("[{}] Streaming transformed SSE to client", ctx.request_id);
            return ClaudeResponseOut {
                status: StatusCode::OK,
                headers: sse_headers(),
                body: OutBody::Sse(sse),
            };
        }
        return match collect_stream_to_json(sse).await {
            Ok(message) => {
                tracing::info!("[{}] Stream collected and converted to JSON", ctx.request_id);
                json_out(&message, ctx)
            },
            Err(e) => error_out(StatusCode::BAD_GATEWAY, "api_error", &e.to_string()),
        };
    }

    let raw = match UpstreamResponse::read_body(Some(body)).await {
        Ok(raw) => raw,
        Err(e) => {
            return error_out(
                StatusCode::BAD_GATEWAY,
                "api_error",
                &format!("Failed to read upstream body: {}", e),
            )
        },
    };
    tracing::debug!("[{}] Upstream response received, len: {} bytes", ctx.request_id, raw.len());

    match transform_response_body(&raw, &options, services).await {
        Ok(message) => json_out(&message, ctx),
        Err(e) => {
            tracing::error!("[{}] {}", ctx.request_id, e);
            error_out(StatusCode::BAD_GATEWAY, "api_error", &e.to_string())
        },
    }
}

async fn passthrough(
    status: StatusCode,
    mut headers: HeaderMap,
    body: Option<BodyStream>,
    ctx: &ResponseContext,
    config: &GatewayConfig,
) -> ClaudeResponseOut {
    headers.remove(header::CONTENT_ENCODING);
    headers.remove(header::CONTENT_LENGTH);
    tracing::warn!("[{}] Upstream returned {}, passing through", ctx.request_id, status);

    if !config.debug {
        let body = body.unwrap_or_else(|| Box::pin(futures::stream::empty()));
        return ClaudeResponseOut { status, headers, body: OutBody::Passthrough(body) };
    }

    match UpstreamResponse::read_body(body).await {
        Ok(raw) => {
            log_capture(ctx, status.as_u16(), &SideCapture { body: raw.clone(), complete: true });
            ClaudeResponseOut { status, headers, body: OutBody::Full(raw) }
        },
        Err(e) => {
            tracing::warn!("[{}] Failed to read upstream error body: {}", ctx.request_id, e);
            ClaudeResponseOut { status, headers, body: OutBody::Full(Bytes::new()) }
        },
    }
}

fn sse_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn json_out(message: &ClaudeResponse, ctx: &ResponseContext) -> ClaudeResponseOut {
    tracing::info!(
        "[{}] Request finished. Model: {}, Tokens: In {}, Out {}",
        ctx.request_id,
        message.model,
        message.usage.input_tokens,
        message.usage.output_tokens
    );
    match serde_json::to_vec(message) {
        Ok(bytes) => ClaudeResponseOut {
            status: StatusCode::OK,
            headers: json_headers(),
            body: OutBody::Full(Bytes::from(bytes)),
        },
        Err(e) => {
            let err = TransformError::Serialization { message: e.to_string() };
            error_out(StatusCode::INTERNAL_SERVER_ERROR, "api_error", &err.to_string())
        },
    }
}

fn error_out(status: StatusCode, error_type: &str, message: &str) -> ClaudeResponseOut {
    let body = json!({
        "type": "error",
        "error": { "type": error_type, "message": message }
    });
    ClaudeResponseOut { status, headers: json_headers(), body: OutBody::Full(Bytes::from(body.to_string())) }
}
