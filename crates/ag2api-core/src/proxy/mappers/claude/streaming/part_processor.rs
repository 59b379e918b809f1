use bytes::Bytes;
use serde_json::{json, Value};

use super::state::{BlockType, StreamingState};
use crate::proxy::common::random_id::generate_tool_use_id;
use crate::proxy::mappers::claude::part::SourcePart;
use crate::proxy::mappers::mcp_xml::Segment;

/// Applies one classified part to the streaming state.
pub struct PartProcessor<'a> {
    state: &'a mut StreamingState,
}

impl<'a> PartProcessor<'a> {
    pub fn new(state: &'a mut StreamingState) -> Self {
        Self { state }
    }

    pub fn process(&mut self, part: SourcePart) -> Vec<Bytes> {
        if !part.is_call() && !part.is_empty_thought() {
            self.state.pending_tool_signature = None;
        }

        if self.state.web_search.is_some() {
            return self.process_grounded(part);
        }

        match part {
            SourcePart::Thinking { text, signature } => self.process_thinking(&text, signature),
            SourcePart::Answer { text, signature } => self.process_answer(&text, signature),
            SourcePart::Call { name, args, id, signature } => {
                self.process_function_call(name, args, id, signature)
            },
        }
    }

    /// Drain the segmenter and the trailing signature at end of response.
    pub fn finish(&mut self) -> Vec<Bytes> {
        let mut chunks = Vec::new();
        if let Some(mut segmenter) = self.state.segmenter.take() {
            let rest = segmenter.flush();
            chunks.extend(self.apply_segments(rest));
        }
        chunks.extend(self.flush_trailing_signature());
        chunks
    }

    /// Web search mode: thinking streams live, answer text waits for finish.
    fn process_grounded(&mut self, part: SourcePart) -> Vec<Bytes> {
        match part {
            SourcePart::Thinking { text, signature } => self.process_thinking(&text, signature),
            SourcePart::Answer { text, .. } => {
                if let Some(capture) = self.state.web_search.as_mut() {
                    capture.buffered_text.push(text);
                }
                vec![]
            },
            SourcePart::Call { name, .. } => {
                tracing::debug!("[Claude-SSE] Ignoring function call '{}' in grounded stream", name);
                vec![]
            },
        }
    }

    fn flush_trailing_signature(&mut self) -> Vec<Bytes> {
        match self.state.trailing_signature.take() {
            Some(signature) => self.state.emit_signature_carrier(signature),
            None => vec![],
        }
    }

    fn process_thinking(&mut self, text: &str, signature: Option<String>) -> Vec<Bytes> {
        self.state.has_thinking = true;

        let mut chunks = self.flush_trailing_signature();

        if self.state.current_block_type() != BlockType::Thinking {
            chunks.extend(self.state.start_thinking_block());
        }

        if !text.is_empty() {
            chunks.push(self.state.emit_delta("thinking_delta", json!({ "thinking": text })));
        }

        if let Some(sig) = signature {
            tracing::debug!("[Claude-SSE] Captured thought_signature (len={})", sig.len());
            if text.is_empty() {
                self.state.pending_tool_signature = Some(sig.clone());
            }
            self.state.pending_signature = Some(sig);
        }

        chunks
    }

    fn process_answer(&mut self, text: &str, signature: Option<String>) -> Vec<Bytes> {
        if text.is_empty() {
            let mut chunks = Vec::new();
            if let Some(sig) = signature {
                chunks.extend(self.flush_trailing_signature());
                self.state.trailing_signature = Some(sig);
            }
            return chunks;
        }

        let mut chunks = self.flush_trailing_signature();

        if let Some(sig) = signature {
            if self.state.options.rehome_allowed(self.state.has_thinking) {
                chunks.extend(self.state.end_block());
                chunks.extend(
                    self.state.start_block(BlockType::Text, json!({ "type": "text", "text": "" })),
                );
                chunks.push(self.state.emit_delta("text_delta", json!({ "text": text })));
                chunks.extend(self.state.end_block());
                chunks.extend(self.state.emit_signature_carrier(sig));
                return chunks;
            }
            tracing::debug!(
                "[Claude-SSE] Dropping answer signature (len={}) in response without thinking",
                sig.len()
            );
        }

        if let Some(segmenter) = self.state.segmenter.as_mut() {
            let segments = segmenter.push_text(text);
            chunks.extend(self.apply_segments(segments));
        } else {
            chunks.extend(self.process_text(text));
        }

        chunks
    }

    fn apply_segments(&mut self, segments: Vec<Segment>) -> Vec<Bytes> {
        let mut chunks = Vec::new();
        for segment in segments {
            match segment {
                Segment::Text(text) if !text.is_empty() => chunks.extend(self.process_text(&text)),
                Segment::Text(_) => {},
                Segment::Tool { name, input } => {
                    chunks.extend(self.process_function_call(name, Some(input), None, None))
                },
            }
        }
        chunks
    }

    fn process_text(&mut self, text: &str) -> Vec<Bytes> {
        let mut chunks = Vec::new();

        if self.state.current_block_type() != BlockType::Text {
            chunks.extend(
                self.state.start_block(BlockType::Text, json!({ "type": "text", "text": "" })),
            );
        }

        chunks.push(self.state.emit_delta("text_delta", json!({ "text": text })));

        chunks
    }

    fn process_function_call(
        &mut self,
        name: String,
        args: Option<Value>,
        id: Option<String>,
        signature: Option<String>,
    ) -> Vec<Bytes> {
        let mut chunks = self.flush_trailing_signature();

        let sig_for_store = signature.clone().or_else(|| self.state.pending_tool_signature.take());
        self.state.pending_tool_signature = None;

        if let Some(sig) = signature {
            let thinking_open = self.state.current_block_type() == BlockType::Thinking;
            if thinking_open && self.state.pending_signature.is_none() {
                self.state.pending_signature = Some(sig);
            } else {
                chunks.extend(self.state.emit_signature_carrier(sig));
            }
        }

        let tool_id = id.unwrap_or_else(generate_tool_use_id);
        if let Some(sig) = sig_for_store {
            self.state.tool_signatures.remember(&tool_id, &sig);
        }

        chunks.extend(self.state.start_block(
            BlockType::Function,
            json!({
                "type": "tool_use",
                "id": tool_id,
                "name": name,
                "input": {}
            }),
        ));

        let args = args.unwrap_or_else(|| json!({}));
        let json_str = serde_json::to_string(&args).unwrap_or_else(|_| "{}".to_string());
        chunks.push(self.state.emit_delta("input_json_delta", json!({ "partial_json": json_str })));

        chunks.extend(self.state.end_block());
        self.state.used_tool = true;

        chunks
    }
}
