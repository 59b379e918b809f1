// Claude non-streaming response transformation (Gemini → Claude)

mod grounding;
mod part_processing;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use ag2api_types::protocol::{ClaudeResponse, ContentBlock, GeminiResponse, StopReason};
use ag2api_types::TransformError;

use super::envelope::parse_gemini_document;
use super::grounding::is_grounded_document;
use super::options::TransformOptions;
use super::part::classify_parts;
use super::usage::to_claude_usage;
use crate::proxy::common::random_id::generate_message_id;
use crate::proxy::mappers::mcp_xml::McpXmlSegmenter;
use crate::proxy::services::TransformServices;
use crate::proxy::signature_store::ToolSignatureStore;

/// Block currently being accumulated.
#[derive(Debug, Default)]
enum OpenBlock {
    #[default]
    None,
    Text(String),
    Thinking { text: String, signature: Option<String> },
}

/// Non-streaming response processor
pub struct NonStreamingProcessor<'a> {
    options: &'a TransformOptions,
    tool_signatures: Arc<dyn ToolSignatureStore>,
    segmenter: Option<Box<dyn McpXmlSegmenter>>,
    content_blocks: Vec<ContentBlock>,
    open: OpenBlock,
    trailing_signature: Option<String>,
    pending_tool_signature: Option<String>,
    has_thinking: bool,
    has_tool_call: bool,
}

impl<'a> NonStreamingProcessor<'a> {
    pub fn new(options: &'a TransformOptions, tool_signatures: Arc<dyn ToolSignatureStore>) -> Self {
        Self {
            options,
            tool_signatures,
            segmenter: options.segmenter(),
            content_blocks: Vec::new(),
            open: OpenBlock::None,
            trailing_signature: None,
            pending_tool_signature: None,
            has_thinking: false,
            has_tool_call: false,
        }
    }

    pub fn process(mut self, gemini_response: &GeminiResponse) -> ClaudeResponse {
        let parts = gemini_response.first_candidate().map(|c| c.parts()).unwrap_or_default();
        let parts = classify_parts(parts);

        // Rule 3 depends on whether thinking occurs anywhere in the response.
        self.has_thinking = parts.iter().any(|p| p.is_thinking());

        for part in parts {
            self.process_part(part);
        }
        self.finish_parts();

        self.build_response(gemini_response)
    }

    fn build_response(self, gemini_response: &GeminiResponse) -> ClaudeResponse {
        let finish_reason =
            gemini_response.first_candidate().and_then(|c| c.finish_reason.as_deref());

        let stop_reason = if self.has_tool_call {
            StopReason::ToolUse
        } else if finish_reason == Some("MAX_TOKENS") {
            StopReason::MaxTokens
        } else {
            StopReason::EndTurn
        };

        let usage = gemini_response
            .usage_metadata
            .as_ref()
            .map(|u| to_claude_usage(u, self.options.max_context_tokens))
            .unwrap_or_default();

        ClaudeResponse::new(
            response_id(gemini_response),
            reported_model(gemini_response, self.options),
            self.content_blocks,
            stop_reason,
            usage,
        )
    }
}

fn response_id(gemini_response: &GeminiResponse) -> String {
    gemini_response
        .response_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_message_id)
}

fn reported_model(gemini_response: &GeminiResponse, options: &TransformOptions) -> String {
    options
        .override_model
        .clone()
        .or_else(|| gemini_response.model_version.clone())
        .unwrap_or_default()
}

/// Transform a complete Gemini response into a Claude message.
///
/// Grounded documents take the web search path; everything else goes through
/// the block builder. Redirect resolution is the only suspension point.
pub async fn transform_response(
    gemini_response: &GeminiResponse,
    options: &TransformOptions,
    services: &TransformServices,
) -> ClaudeResponse {
    if let Some(holder) = &options.usage_holder {
        holder.record_model(&reported_model(gemini_response, options));
        if let Some(usage) = &gemini_response.usage_metadata {
            holder.record_usage(usage, options.max_context_tokens);
        }
    }

    let grounded = gemini_response.first_candidate().is_some_and(is_grounded_document);
    if grounded {
        tracing::debug!("[Claude-Response] Grounding metadata present, building web search message");
        return grounding::build_web_search_message(gemini_response, options, services).await;
    }

    NonStreamingProcessor::new(options, Arc::clone(&services.tool_signatures)).process(gemini_response)
}

/// Parse a raw upstream body and transform it.
pub async fn transform_response_body(
    body: &[u8],
    options: &TransformOptions,
    services: &TransformServices,
) -> Result<ClaudeResponse, TransformError> {
    let raw = std::str::from_utf8(body)
        .map_err(|e| TransformError::InvalidDocument { message: e.to_string() })?;
    let gemini_response = parse_gemini_document(raw)?;
    Ok(transform_response(&gemini_response, options, services).await)
}
