// Web search finalization for the streaming transformer

use ag2api_types::protocol::Candidate;
use bytes::Bytes;
use serde_json::json;

use super::state::{BlockType, StreamingState, WebSearchCapture};
use crate::proxy::common::random_id::generate_server_tool_id;
use crate::proxy::mappers::claude::grounding::{
    resolve_result_urls, RedirectResolver, WEB_SEARCH_TOOL_NAME,
};

impl StreamingState {
    /// Switch to web search mode (once) and merge this candidate's grounding fields.
    pub fn capture_grounding(&mut self, candidate: &Candidate) {
        if self.web_search.is_none() {
            if !candidate.carries_grounding() {
                return;
            }
            tracing::debug!("[Grounding] Grounding metadata seen, buffering answer text");
            self.web_search = Some(WebSearchCapture {
                tool_use_id: generate_server_tool_id(),
                ..WebSearchCapture::default()
            });
        }

        if let Some(capture) = self.web_search.as_mut() {
            capture.grounding.update_from_candidate(candidate);
        }
    }

    /// Resolve redirect URLs of the captured results. Idempotent.
    pub async fn resolve_grounding_urls(&mut self, resolver: &dyn RedirectResolver) {
        let Some(capture) = self.web_search.as_mut() else {
            return;
        };
        if capture.urls_resolved {
            return;
        }
        resolve_result_urls(&mut capture.grounding.results, resolver).await;
        capture.urls_resolved = true;
    }

    /// Emit, in order: a closed thinking block, `server_tool_use`,
    /// `web_search_tool_result`, citation-only text blocks, and the buffered
    /// answer text.
    pub(super) fn emit_web_search_blocks(&mut self) -> Vec<Bytes> {
        let Some(capture) = self.web_search.take() else {
            return vec![];
        };
        let mut chunks = Vec::new();

        if self.block_index == 0 && self.block_type == BlockType::None {
            chunks.extend(self.start_thinking_block());
            chunks.push(self.emit_delta("thinking_delta", json!({ "thinking": "" })));
            chunks.extend(self.end_block());
        } else if self.block_type == BlockType::Thinking {
            chunks.push(self.emit_delta("thinking_delta", json!({ "thinking": "" })));
            chunks.extend(self.end_block());
        } else {
            chunks.extend(self.end_block());
        }

        let query = json!({ "query": capture.grounding.query }).to_string();
        chunks.extend(self.start_block(
            BlockType::Function,
            json!({
                "type": "server_tool_use",
                "id": capture.tool_use_id,
                "name": WEB_SEARCH_TOOL_NAME,
                "input": {}
            }),
        ));
        chunks.push(self.emit_delta("input_json_delta", json!({ "partial_json": query })));
        chunks.extend(self.end_block());

        chunks.extend(self.start_block(
            BlockType::Text,
            json!({
                "type": "web_search_tool_result",
                "tool_use_id": capture.tool_use_id,
                "content": capture.grounding.results
            }),
        ));
        chunks.extend(self.end_block());

        for citations in capture.grounding.citation_groups() {
            chunks.extend(
                self.start_block(
                    BlockType::Text,
                    json!({ "type": "text", "text": "", "citations": [] }),
                ),
            );
            for citation in citations {
                chunks.push(self.emit_delta("citations_delta", json!({ "citation": citation })));
            }
            chunks.extend(self.end_block());
        }

        chunks.extend(self.start_block(BlockType::Text, json!({ "type": "text", "text": "" })));
        for text in capture.buffered_text.iter().filter(|t| !t.is_empty()) {
            chunks.push(self.emit_delta("text_delta", json!({ "text": text })));
        }
        chunks.extend(self.end_block());

        chunks
    }
}
