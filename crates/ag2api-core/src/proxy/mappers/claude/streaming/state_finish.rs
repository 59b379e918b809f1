use bytes::Bytes;
use serde_json::json;

use ag2api_types::protocol::{GeminiResponse, StopReason, UsageMetadata};

use super::part_processor::PartProcessor;
use super::state::{BlockType, StreamingState};
use crate::proxy::mappers::claude::usage::with_web_search_request;

const MESSAGE_STOP: &str = "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n";

impl StreamingState {
    /// Close out the response: remaining blocks, `message_delta`, `message_stop`.
    ///
    /// Runs at most once; later calls return nothing. Grounding URLs must
    /// already be resolved when the response is in web search mode.
    pub fn emit_finish(
        &mut self,
        finish_reason: Option<&str>,
        usage_metadata: Option<&UsageMetadata>,
    ) -> Vec<Bytes> {
        if self.message_stop_sent {
            return vec![];
        }

        let mut chunks = Vec::new();
        if !self.message_start_sent {
            chunks.push(self.emit_message_start(&GeminiResponse::default()));
        }

        let was_inside_block = self.block_type != BlockType::None;
        let prev_block_type = self.block_type;

        chunks.extend(PartProcessor::new(self).finish());

        let grounded = self.is_web_search_mode();
        if grounded {
            chunks.extend(self.emit_web_search_blocks());
        } else {
            chunks.extend(self.end_block());
        }

        if let Some(usage) = usage_metadata {
            self.record_usage(usage);
        }

        let stop_reason =
            self.determine_stop_reason(finish_reason, was_inside_block, prev_block_type);

        let mut usage = self.final_usage();
        if grounded {
            usage = with_web_search_request(usage);
        }

        chunks.push(self.emit(
            "message_delta",
            json!({
                "type": "message_delta",
                "delta": { "stop_reason": stop_reason.as_str(), "stop_sequence": null },
                "usage": usage
            }),
        ));

        chunks.push(Bytes::from(MESSAGE_STOP));
        self.message_stop_sent = true;

        chunks
    }

    fn determine_stop_reason(
        &self,
        finish_reason: Option<&str>,
        was_inside_block: bool,
        prev_block_type: BlockType,
    ) -> StopReason {
        if self.used_tool {
            StopReason::ToolUse
        } else if finish_reason == Some("MAX_TOKENS") {
            StopReason::MaxTokens
        } else if finish_reason.is_none() && was_inside_block {
            tracing::warn!(
                "[Truncation Detected] Stream ended without finish_reason while inside {:?} block",
                prev_block_type
            );
            StopReason::MaxTokens
        } else {
            StopReason::EndTurn
        }
    }
}
