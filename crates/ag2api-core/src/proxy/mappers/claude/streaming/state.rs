use std::sync::Arc;

use ag2api_types::protocol::UsageMetadata;
use bytes::Bytes;
use serde_json::{json, Value};

use crate::proxy::mappers::claude::grounding::GroundingData;
use crate::proxy::mappers::claude::options::TransformOptions;
use crate::proxy::mappers::mcp_xml::McpXmlSegmenter;
use crate::proxy::signature_store::{InMemoryToolSignatureStore, ToolSignatureStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    None,
    Text,
    Thinking,
    Function,
}

/// Web search capture; present once any chunk carried grounding fields.
#[derive(Debug, Default)]
pub(super) struct WebSearchCapture {
    pub tool_use_id: String,
    pub grounding: GroundingData,
    /// Non-thought answer texts in arrival order, replayed at finish.
    pub buffered_text: Vec<String>,
    pub urls_resolved: bool,
}

/// Per-response state of the streaming transformer.
pub struct StreamingState {
    pub(super) block_type: BlockType,
    pub block_index: usize,
    pub message_start_sent: bool,
    pub message_stop_sent: bool,
    pub stream_errored: bool,
    pub(super) used_tool: bool,
    pub(super) has_thinking: bool,
    /// Signature emitted as `signature_delta` when the open thinking block ends.
    pub(super) pending_signature: Option<String>,
    pub(super) trailing_signature: Option<String>,
    pub(super) pending_tool_signature: Option<String>,
    pub(super) web_search: Option<WebSearchCapture>,
    pub(super) last_usage: Option<UsageMetadata>,
    pub(super) options: TransformOptions,
    pub(super) segmenter: Option<Box<dyn McpXmlSegmenter>>,
    pub(super) tool_signatures: Arc<dyn ToolSignatureStore>,
}

impl Default for StreamingState {
    fn default() -> Self {
        Self::new(TransformOptions::default(), Arc::new(InMemoryToolSignatureStore::new()))
    }
}

impl StreamingState {
    pub fn new(options: TransformOptions, tool_signatures: Arc<dyn ToolSignatureStore>) -> Self {
        Self {
            block_type: BlockType::None,
            block_index: 0,
            message_start_sent: false,
            message_stop_sent: false,
            stream_errored: false,
            used_tool: false,
            has_thinking: false,
            pending_signature: None,
            trailing_signature: None,
            pending_tool_signature: None,
            web_search: None,
            last_usage: None,
            segmenter: options.segmenter(),
            options,
            tool_signatures,
        }
    }

    pub fn emit(&self, event_type: &str, data: Value) -> Bytes {
        let sse = format!(
            "event: {}\ndata: {}\n\n",
            event_type,
            serde_json::to_string(&data).unwrap_or_default()
        );
        Bytes::from(sse)
    }

    pub fn start_block(&mut self, block_type: BlockType, content_block: Value) -> Vec<Bytes> {
        let mut chunks = Vec::new();
        if self.block_type != BlockType::None {
            chunks.extend(self.end_block());
        }

        chunks.push(self.emit(
            "content_block_start",
            json!({
                "type": "content_block_start",
                "index": self.block_index,
                "content_block": content_block
            }),
        ));

        self.block_type = block_type;
        chunks
    }

    /// Open a thinking block. The start event always carries an empty signature.
    pub fn start_thinking_block(&mut self) -> Vec<Bytes> {
        self.start_block(
            BlockType::Thinking,
            json!({ "type": "thinking", "thinking": "", "signature": "" }),
        )
    }

    pub fn end_block(&mut self) -> Vec<Bytes> {
        if self.block_type == BlockType::None {
            return vec![];
        }

        let mut chunks = Vec::new();

        if self.block_type == BlockType::Thinking {
            if let Some(signature) = self.pending_signature.take() {
                chunks.push(self.emit_delta("signature_delta", json!({ "signature": signature })));
            }
        }

        chunks.push(self.emit(
            "content_block_stop",
            json!({
                "type": "content_block_stop",
                "index": self.block_index
            }),
        ));

        self.block_index += 1;
        self.block_type = BlockType::None;

        chunks
    }

    pub fn emit_delta(&self, delta_type: &str, delta_content: Value) -> Bytes {
        let mut delta = json!({ "type": delta_type });
        if let Value::Object(map) = delta_content {
            for (k, v) in map {
                delta[k] = v;
            }
        }

        self.emit(
            "content_block_delta",
            json!({
                "type": "content_block_delta",
                "index": self.block_index,
                "delta": delta
            }),
        )
    }

    /// Zero-length thinking block carrying only `signature`, or nothing when
    /// stray signatures are dropped for this response.
    pub fn emit_signature_carrier(&mut self, signature: String) -> Vec<Bytes> {
        if !self.options.rehome_allowed(self.has_thinking) {
            tracing::debug!(
                "[Claude-SSE] Dropping stray signature (len={}) in response without thinking",
                signature.len()
            );
            return vec![];
        }

        let mut chunks = self.start_thinking_block();
        chunks.push(self.emit_delta("thinking_delta", json!({ "thinking": "" })));
        self.pending_signature = Some(signature);
        chunks.extend(self.end_block());
        chunks
    }

    pub fn current_block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn current_block_index(&self) -> usize {
        self.block_index
    }

    pub fn is_web_search_mode(&self) -> bool {
        self.web_search.is_some()
    }

    pub(crate) fn record_usage(&mut self, usage: &UsageMetadata) {
        self.last_usage = Some(*usage);
        if let Some(holder) = &self.options.usage_holder {
            holder.record_usage(usage, self.options.max_context_tokens);
        }
    }
}
