//! Upstream module - the call result handed to the response side

mod fan_out;

pub use fan_out::{fan_out, SideCapture, SideCursor};

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// Upstream body as a byte stream; errors are transport failures.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, String>> + Send>>;

/// Result of one upstream call.
pub struct UpstreamResponse {
    pub ok: bool,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<BodyStream>,
}

impl UpstreamResponse {
    /// Wrap a live reqwest response without reading its body.
    pub fn from_reqwest(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map(|item| item.map_err(|e| e.to_string()));
        Self { ok: status.is_success(), status, headers, body: Some(Box::pin(body)) }
    }

    /// Response whose body is already in memory (replays, tests).
    pub fn from_bytes(status: StatusCode, body: Bytes) -> Self {
        let body: BodyStream = Box::pin(futures::stream::once(async move { Ok(body) }));
        Self { ok: status.is_success(), status, headers: HeaderMap::new(), body: Some(body) }
    }

    /// Read the whole body into memory. A missing body reads as empty.
    pub async fn read_body(body: Option<BodyStream>) -> Result<Bytes, String> {
        let Some(mut body) = body else {
            return Ok(Bytes::new());
        };
        let mut buf = bytes::BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("ok", &self.ok)
            .field("status", &self.status)
            .field("has_body", &self.body.is_some())
            .finish_non_exhaustive()
    }
}
