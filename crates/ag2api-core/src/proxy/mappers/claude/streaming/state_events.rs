use ag2api_types::protocol::{GeminiResponse, Usage};
use bytes::Bytes;
use serde_json::{json, Value};

use super::state::StreamingState;
use crate::proxy::common::random_id::generate_message_id;
use crate::proxy::mappers::claude::usage::to_claude_usage;

impl StreamingState {
    pub fn emit_message_start(&mut self, raw: &GeminiResponse) -> Bytes {
        if self.message_start_sent {
            return Bytes::new();
        }

        // Clients expect message.usage to be an object even before any usage arrives.
        let usage = raw
            .usage_metadata
            .as_ref()
            .map(|u| to_claude_usage(u, self.options.max_context_tokens))
            .unwrap_or_default();

        let model = self
            .options
            .override_model
            .clone()
            .or_else(|| raw.model_version.clone())
            .unwrap_or_default();

        if let Some(holder) = &self.options.usage_holder {
            holder.record_model(&model);
        }

        let message = json!({
            "id": raw.response_id.clone().filter(|id| !id.is_empty()).unwrap_or_else(generate_message_id),
            "type": "message",
            "role": "assistant",
            "content": [],
            "model": model,
            "stop_reason": null,
            "stop_sequence": null,
            "usage": usage,
        });

        let result = self.emit(
            "message_start",
            json!({
                "type": "message_start",
                "message": message
            }),
        );

        self.message_start_sent = true;
        result
    }

    /// Claude `error` event for an error object injected into the upstream stream.
    pub fn emit_upstream_error(&self, error: &Value) -> Bytes {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown upstream error");

        self.emit(
            "error",
            json!({
                "type": "error",
                "error": {
                    "type": "overloaded_error",
                    "message": format!("Upstream error: {}", message)
                }
            }),
        )
    }

    pub(super) fn final_usage(&self) -> Usage {
        self.last_usage
            .as_ref()
            .map(|u| to_claude_usage(u, self.options.max_context_tokens))
            .unwrap_or_default()
    }
}
