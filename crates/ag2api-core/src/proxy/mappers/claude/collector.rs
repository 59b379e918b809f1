// Stream collector - converts a Claude SSE stream back into one message
// Used when the upstream had to be called in streaming mode for a JSON client

use ag2api_types::protocol::{Citation, ClaudeResponse, ContentBlock, SearchResult, StopReason, Usage};
use ag2api_types::TransformError;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde_json::{json, Value};

/// SSE event type
#[derive(Debug, Clone)]
struct SseEvent {
    event_type: String,
    data: Value,
}

/// Parse SSE line
fn parse_sse_line(line: &str) -> Option<(&str, &str)> {
    let colon_pos = line.find(':')?;
    Some((&line[..colon_pos], line[colon_pos + 1..].trim_start()))
}

/// Block under construction between `content_block_start` and `content_block_stop`.
enum PendingBlock {
    Text { text: String, citations: Option<Vec<Citation>> },
    Thinking { thinking: String, signature: Option<String> },
    Tool { id: String, name: String, input_json: String, server: bool },
    Complete(ContentBlock),
}

impl PendingBlock {
    fn from_start(content_block: &Value) -> Option<Self> {
        let str_field = |key: &str| {
            content_block.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
        };

        match content_block.get("type").and_then(Value::as_str)? {
            "text" => Some(Self::Text {
                text: str_field("text"),
                citations: content_block.get("citations").map(|_| Vec::new()),
            }),
            "thinking" => Some(Self::Thinking {
                thinking: str_field("thinking"),
                signature: Some(str_field("signature")).filter(|s| !s.is_empty()),
            }),
            kind @ ("tool_use" | "server_tool_use") => Some(Self::Tool {
                id: str_field("id"),
                name: str_field("name"),
                input_json: String::new(),
                server: kind == "server_tool_use",
            }),
            "web_search_tool_result" => {
                let content = content_block
                    .get("content")
                    .cloned()
                    .and_then(|c| serde_json::from_value::<Vec<SearchResult>>(c).ok())
                    .unwrap_or_default();
                Some(Self::Complete(ContentBlock::WebSearchToolResult {
                    tool_use_id: str_field("tool_use_id"),
                    content,
                }))
            },
            other => {
                tracing::debug!("[Collector] Ignoring unknown block type: {}", other);
                None
            },
        }
    }

    fn apply_delta(&mut self, delta: &Value) {
        let field = |key: &str| delta.get(key).and_then(Value::as_str);
        match (self, delta.get("type").and_then(Value::as_str)) {
            (Self::Text { text, .. }, Some("text_delta")) => {
                text.push_str(field("text").unwrap_or_default())
            },
            (Self::Text { citations, .. }, Some("citations_delta")) => {
                if let Some(citation) = delta
                    .get("citation")
                    .cloned()
                    .and_then(|c| serde_json::from_value::<Citation>(c).ok())
                {
                    citations.get_or_insert_with(Vec::new).push(citation);
                }
            },
            (Self::Thinking { thinking, .. }, Some("thinking_delta")) => {
                thinking.push_str(field("thinking").unwrap_or_default())
            },
            (Self::Thinking { signature, .. }, Some("signature_delta")) => {
                *signature = field("signature").map(str::to_string)
            },
            (Self::Tool { input_json, .. }, Some("input_json_delta")) => {
                input_json.push_str(field("partial_json").unwrap_or_default())
            },
            _ => {},
        }
    }

    fn finish(self) -> Option<ContentBlock> {
        match self {
            Self::Text { text, citations } => {
                let has_citations = citations.as_ref().is_some_and(|c| !c.is_empty());
                (!text.is_empty() || has_citations).then(|| ContentBlock::Text {
                    text,
                    citations: citations.filter(|c| !c.is_empty()),
                })
            },
            Self::Thinking { thinking, signature } => {
                Some(ContentBlock::Thinking { thinking, signature })
            },
            Self::Tool { id, name, input_json, server } => {
                let input = if input_json.is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&input_json).unwrap_or_else(|_| json!({}))
                };
                Some(if server {
                    ContentBlock::ServerToolUse { id, name, input }
                } else {
                    ContentBlock::ToolUse { id, name, input }
                })
            },
            Self::Complete(block) => Some(block),
        }
    }
}

/// Collect SSE Stream as complete Claude Response
///
/// Receives the transformer's SSE byte stream, parses all events, and
/// rebuilds the message the non-streaming path would have produced.
pub async fn collect_stream_to_json<S>(mut stream: S) -> Result<ClaudeResponse, TransformError>
where
    S: futures::Stream<Item = Result<Bytes, TransformError>> + Unpin,
{
    let mut events = Vec::new();
    let mut current_event_type = String::new();
    let mut current_data = String::new();

    // 1. Collect all SSE events
    let mut line_buffer = BytesMut::new();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result?;
        line_buffer.extend_from_slice(&chunk);

        while let Some(newline_pos) = line_buffer.iter().position(|&b| b == b'\n') {
            let line_raw = line_buffer.split_to(newline_pos + 1);
            let line = String::from_utf8_lossy(&line_raw);
            let line = line.trim_end_matches(['\r', '\n']);

            if line.is_empty() {
                if !current_data.is_empty() {
                    match serde_json::from_str::<Value>(&current_data) {
                        Ok(data) => events.push(SseEvent {
                            event_type: std::mem::take(&mut current_event_type),
                            data,
                        }),
                        Err(e) => tracing::warn!("[Collector] Skipping undecodable event: {}", e),
                    }
                    current_event_type.clear();
                    current_data.clear();
                }
            } else if let Some((key, value)) = parse_sse_line(line) {
                match key {
                    "event" => current_event_type = value.to_string(),
                    "data" => current_data = value.to_string(),
                    // Only "event" and "data" fields are used
                    _ => {},
                }
            }
        }
    }

    // 2. Reconstruct ClaudeResponse
    let mut id = String::new();
    let mut model = String::new();
    let mut content = Vec::new();
    let mut stop_reason = StopReason::EndTurn;
    let mut usage = Usage::default();
    let mut current: Option<PendingBlock> = None;

    for event in events {
        match event.event_type.as_str() {
            "message_start" => {
                if let Some(message) = event.data.get("message") {
                    if let Some(v) = message.get("id").and_then(Value::as_str) {
                        id = v.to_string();
                    }
                    if let Some(v) = message.get("model").and_then(Value::as_str) {
                        model = v.to_string();
                    }
                    if let Some(u) =
                        message.get("usage").and_then(|u| serde_json::from_value(u.clone()).ok())
                    {
                        usage = u;
                    }
                }
            },

            "content_block_start" => {
                current = event.data.get("content_block").and_then(PendingBlock::from_start);
            },

            "content_block_delta" => {
                if let (Some(block), Some(delta)) = (current.as_mut(), event.data.get("delta")) {
                    block.apply_delta(delta);
                }
            },

            "content_block_stop" => {
                if let Some(block) = current.take().and_then(PendingBlock::finish) {
                    content.push(block);
                }
            },

            "message_delta" => {
                if let Some(reason) = event
                    .data
                    .get("delta")
                    .and_then(|d| d.get("stop_reason"))
                    .and_then(|r| serde_json::from_value::<StopReason>(r.clone()).ok())
                {
                    stop_reason = reason;
                }
                if let Some(u) =
                    event.data.get("usage").and_then(|u| serde_json::from_value(u.clone()).ok())
                {
                    usage = u;
                }
            },

            "message_stop" => break,

            "error" => {
                let message = event
                    .data
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("upstream error")
                    .to_string();
                return Err(TransformError::StreamAborted { message });
            },

            _ => {},
        }
    }

    if id.is_empty() {
        id = crate::proxy::common::random_id::generate_message_id();
    }

    Ok(ClaudeResponse::new(id, model, content, stop_reason, usage))
}
