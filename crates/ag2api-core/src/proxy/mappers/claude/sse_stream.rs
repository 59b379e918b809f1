// SSE stream transformation: Gemini → Claude format
// Handles line framing, chunk dispatch and end-of-stream finalization

use ag2api_types::protocol::{GeminiResponse, UsageMetadata};
use ag2api_types::TransformError;
use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use std::fmt::Display;
use std::pin::Pin;

use super::envelope::unwrap_envelope;
use super::grounding::RedirectResolver;
use super::options::TransformOptions;
use super::part::classify_parts;
use super::streaming::{PartProcessor, StreamingState};
use crate::proxy::services::TransformServices;

/// Longest unterminated SSE line accepted from upstream.
pub const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

/// Guard that aborts a spawned task when dropped (client disconnect cleanup)
struct AbortOnDrop<T>(tokio::task::JoinHandle<T>);
impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Create Gemini SSE stream to Claude SSE stream converter
///
/// The source is read by a small pump task through a bounded channel, so a
/// client that stops pulling also stops upstream reads. Dropping the returned
/// stream aborts the pump and releases the source body.
pub fn create_claude_sse_stream<E>(
    mut gemini_stream: Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>,
    options: TransformOptions,
    services: TransformServices,
) -> Pin<Box<dyn Stream<Item = Result<Bytes, TransformError>> + Send>>
where
    E: Display + Send + 'static,
{
    use async_stream::stream;
    use bytes::BytesMut;
    use futures::StreamExt;

    Box::pin(stream! {
        let mut state = StreamingState::new(options, services.tool_signatures.clone());
        let redirects = services.redirects.clone();
        let mut buffer = BytesMut::new();
        let mut aborted = false;

        let (tx, mut rx) = tokio::sync::mpsc::channel::<Result<Bytes, E>>(2);

        let pump = tokio::spawn(async move {
            while let Some(item) = gemini_stream.next().await {
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });
        let _pump_guard = AbortOnDrop(pump);

        while let Some(item) = rx.recv().await {
            match item {
                Ok(chunk) => {
                    buffer.extend_from_slice(&chunk);

                    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line_raw = buffer.split_to(pos + 1);
                        let line = match std::str::from_utf8(&line_raw) {
                            Ok(s) => s.trim(),
                            Err(e) => {
                                tracing::warn!("[Claude-SSE] SSE line UTF-8 decode error: {} | {} bytes", e, line_raw.len());
                                continue;
                            }
                        };
                        if line.is_empty() {
                            continue;
                        }

                        for sse_chunk in process_sse_line(line, &mut state, redirects.as_ref()).await {
                            yield Ok(sse_chunk);
                        }
                    }

                    if buffer.len() > MAX_LINE_BYTES {
                        tracing::error!("[Claude-SSE] SSE line exceeded {}MB limit, aborting stream", MAX_LINE_BYTES / 1024 / 1024);
                        state.stream_errored = true;
                        aborted = true;
                        yield Err(TransformError::BufferOverflow { limit_bytes: MAX_LINE_BYTES });
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("[Claude-SSE] Upstream stream aborted: {}", e);
                    state.stream_errored = true;
                    aborted = true;
                    yield Err(TransformError::StreamAborted { message: e.to_string() });
                    break;
                }
            }
        }

        if !aborted {
            // Last line without a trailing newline.
            let rest = String::from_utf8_lossy(&buffer).trim().to_string();
            if !rest.is_empty() {
                for sse_chunk in process_sse_line(&rest, &mut state, redirects.as_ref()).await {
                    yield Ok(sse_chunk);
                }
            }

            for sse_chunk in emit_force_stop(&mut state, redirects.as_ref()).await {
                yield Ok(sse_chunk);
            }
        }
    })
}

/// Handle one SSE line from upstream.
async fn process_sse_line(
    line: &str,
    state: &mut StreamingState,
    redirects: &dyn RedirectResolver,
) -> Vec<Bytes> {
    let Some(data_str) = line.strip_prefix("data:").map(str::trim) else {
        return vec![];
    };
    if data_str.is_empty() {
        return vec![];
    }

    if data_str == "[DONE]" {
        return emit_force_stop(state, redirects).await;
    }

    if state.message_stop_sent {
        tracing::debug!("[Claude-SSE] Ignoring chunk after message_stop");
        return vec![];
    }

    let json_value: Value = match serde_json::from_str(data_str) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(
                "[Claude-SSE] SSE JSON parse error: {} | data: {}",
                e,
                data_str.chars().take(200).collect::<String>()
            );
            return vec![];
        },
    };

    let raw_json = unwrap_envelope(json_value);

    if let Some(error) = raw_json.get("error") {
        tracing::error!("[Claude-SSE] Upstream error in SSE stream: {}", error);
        return vec![state.emit_upstream_error(error)];
    }

    let chunk: GeminiResponse = match serde_json::from_value(raw_json) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::warn!("[Claude-SSE] Unexpected chunk shape: {}", e);
            return vec![];
        },
    };

    let mut chunks = Vec::new();

    if !state.message_start_sent {
        chunks.push(state.emit_message_start(&chunk));
    }

    if let Some(usage) = &chunk.usage_metadata {
        state.record_usage(usage);
    }

    let Some(candidate) = chunk.first_candidate() else {
        return chunks;
    };

    state.capture_grounding(candidate);

    for part in classify_parts(candidate.parts()) {
        let mut processor = PartProcessor::new(state);
        chunks.extend(processor.process(part));
    }

    if let Some(finish_reason) = candidate.finish_reason.as_deref().filter(|r| !r.is_empty()) {
        tracing::info!("[Claude-SSE] Stream completed | Reason: {}", finish_reason);
        chunks.extend(
            finish(state, Some(finish_reason), chunk.usage_metadata.as_ref(), redirects).await,
        );
    }

    chunks
}

async fn finish(
    state: &mut StreamingState,
    finish_reason: Option<&str>,
    usage: Option<&UsageMetadata>,
    redirects: &dyn RedirectResolver,
) -> Vec<Bytes> {
    if state.stream_errored || state.message_stop_sent {
        return vec![];
    }
    state.resolve_grounding_urls(redirects).await;
    state.emit_finish(finish_reason, usage)
}

/// Finish a stream that ended without a finish reason (EOF or `[DONE]`).
pub async fn emit_force_stop(
    state: &mut StreamingState,
    redirects: &dyn RedirectResolver,
) -> Vec<Bytes> {
    finish(state, None, None, redirects).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::proxy::mappers::claude::grounding::NoopRedirectResolver;
    use crate::proxy::mappers::claude::streaming::BlockType;
    use futures::StreamExt;
    use serde_json::json;

    fn joined(chunks: &[Bytes]) -> String {
        chunks.iter().map(|b| String::from_utf8(b.to_vec()).unwrap_or_default()).collect()
    }

    #[tokio::test]
    async fn test_process_sse_line_done() {
        let mut state = StreamingState::default();
        let chunks = process_sse_line("data: [DONE]", &mut state, &NoopRedirectResolver).await;
        let all_text = joined(&chunks);
        assert!(all_text.contains("message_start"));
        assert!(all_text.contains("message_stop"));
        assert!(state.message_stop_sent);
    }

    #[tokio::test]
    async fn test_process_sse_line_with_text() {
        let mut state = StreamingState::default();
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"Hello"}]}}],"usageMetadata":{},"modelVersion":"test","responseId":"123"}"#;

        let chunks = process_sse_line(line, &mut state, &NoopRedirectResolver).await;
        let all_text = joined(&chunks);
        assert!(all_text.contains("message_start"));
        assert!(all_text.contains(r#""id":"123""#));
        assert!(all_text.contains("content_block_start"));
        assert!(all_text.contains("Hello"));
        assert!(!all_text.contains("message_stop"));
    }

    #[tokio::test]
    async fn test_malformed_line_is_skipped() {
        let mut state = StreamingState::default();
        let chunks = process_sse_line("data: {not json", &mut state, &NoopRedirectResolver).await;
        assert!(chunks.is_empty());
        assert!(!state.message_start_sent);
    }

    #[tokio::test]
    async fn test_upstream_error_chunk_emits_error_event() {
        let mut state = StreamingState::default();
        let line = r#"data: {"response":{"error":{"code":503,"message":"overloaded"}}}"#;
        let chunks = process_sse_line(line, &mut state, &NoopRedirectResolver).await;
        let all_text = joined(&chunks);
        assert!(all_text.starts_with("event: error\n"));
        assert!(all_text.contains("overloaded_error"));
        assert!(all_text.contains("Upstream error: overloaded"));
    }

    #[tokio::test]
    async fn test_force_stop_reports_truncation() {
        let mut state = StreamingState::default();
        state.message_start_sent = true;
        state.start_block(BlockType::Text, json!({ "type": "text", "text": "" }));

        let all_text = joined(&emit_force_stop(&mut state, &NoopRedirectResolver).await);
        assert!(all_text.contains(r#""stop_reason":"max_tokens""#));
        assert!(all_text.contains("message_stop"));
    }

    #[tokio::test]
    async fn test_force_stop_skips_when_stream_errored() {
        let mut state = StreamingState::default();
        state.start_block(BlockType::Text, json!({ "type": "text", "text": "" }));
        state.stream_errored = true;

        assert!(emit_force_stop(&mut state, &NoopRedirectResolver).await.is_empty());
    }

    fn source(
        items: Vec<Result<&'static str, &'static str>>,
    ) -> Pin<Box<dyn Stream<Item = Result<Bytes, String>> + Send>> {
        Box::pin(futures::stream::iter(
            items.into_iter().map(|r| r.map(Bytes::from).map_err(str::to_string)),
        ))
    }

    async fn collect_all(
        items: Vec<Result<&'static str, &'static str>>,
    ) -> Vec<Result<Bytes, TransformError>> {
        create_claude_sse_stream(source(items), TransformOptions::default(), TransformServices::offline())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_stream_lines_split_across_network_chunks() {
        let out = collect_all(vec![
            Ok("data: {\"candidates\":[{\"content\":{\"parts\":[{\"te"),
            Ok("xt\":\"Hi\"}]},\"finishReason\":\"STOP\"}]}\n\ndata: [DONE]\n"),
        ])
        .await;

        let text: String = out
            .iter()
            .map(|r| String::from_utf8(r.as_ref().unwrap().to_vec()).unwrap())
            .collect();
        assert!(text.contains(r#""text":"Hi""#));
        assert_eq!(text.matches("event: message_stop").count(), 1);
        assert!(text.contains(r#""stop_reason":"end_turn""#));
    }

    #[tokio::test]
    async fn test_clean_eof_without_finish_reason_still_finishes() {
        let out = collect_all(vec![Ok(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"partial\"}]}}]}",
        )])
        .await;

        let text: String = out
            .iter()
            .map(|r| String::from_utf8(r.as_ref().unwrap().to_vec()).unwrap())
            .collect();
        assert!(text.contains("partial"));
        assert!(text.contains(r#""stop_reason":"max_tokens""#));
        assert_eq!(text.matches("event: message_stop").count(), 1);
    }

    #[tokio::test]
    async fn test_source_abort_ends_without_message_stop() {
        let out = collect_all(vec![
            Ok("data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a\"}]}}]}\n"),
            Err("connection reset"),
        ])
        .await;

        let last = out.last().unwrap();
        assert!(matches!(last, Err(TransformError::StreamAborted { message }) if message == "connection reset"));
        let text: String = out
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|b| String::from_utf8(b.to_vec()).unwrap())
            .collect();
        assert!(!text.contains("message_stop"));
    }
}
