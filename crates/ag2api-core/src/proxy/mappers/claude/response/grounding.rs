// Grounded (web search) non-streaming message

use ag2api_types::protocol::{ClaudeResponse, ContentBlock, GeminiResponse, StopReason};
use serde_json::json;

use super::{reported_model, response_id};
use crate::proxy::common::random_id::generate_server_tool_id;
use crate::proxy::mappers::claude::grounding::{resolve_result_urls, GroundingData, WEB_SEARCH_TOOL_NAME};
use crate::proxy::mappers::claude::options::TransformOptions;
use crate::proxy::mappers::claude::part::{classify_parts, SourcePart};
use crate::proxy::mappers::claude::usage::{to_claude_usage, with_web_search_request};
use crate::proxy::services::TransformServices;

/// Build the fixed-order web search message:
/// thinking?, server_tool_use, web_search_tool_result, citation blocks, answer text?
pub(super) async fn build_web_search_message(
    gemini_response: &GeminiResponse,
    options: &TransformOptions,
    services: &TransformServices,
) -> ClaudeResponse {
    let candidate = gemini_response.first_candidate().cloned().unwrap_or_default();

    let mut grounding = GroundingData::from_candidate(&candidate);
    resolve_result_urls(&mut grounding.results, services.redirects.as_ref()).await;

    let mut thinking_text = String::new();
    let mut answer_text = String::new();
    for part in classify_parts(candidate.parts()) {
        match part {
            SourcePart::Thinking { text, .. } => thinking_text.push_str(&text),
            SourcePart::Answer { text, .. } => answer_text.push_str(&text),
            SourcePart::Call { name, .. } => {
                tracing::debug!("[Grounding] Ignoring function call '{}' in grounded response", name);
            },
        }
    }

    let tool_use_id = generate_server_tool_id();
    let mut content = Vec::new();

    if !thinking_text.is_empty() {
        content.push(ContentBlock::thinking(thinking_text, None));
    }
    content.push(ContentBlock::ServerToolUse {
        id: tool_use_id.clone(),
        name: WEB_SEARCH_TOOL_NAME.to_string(),
        input: json!({ "query": grounding.query }),
    });
    content.push(ContentBlock::WebSearchToolResult {
        tool_use_id,
        content: grounding.results.clone(),
    });
    for citations in grounding.citation_groups() {
        content.push(ContentBlock::Text { text: String::new(), citations: Some(citations) });
    }
    if !answer_text.is_empty() {
        content.push(ContentBlock::text(answer_text));
    }

    let stop_reason = if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
        StopReason::MaxTokens
    } else {
        StopReason::EndTurn
    };

    let usage = with_web_search_request(
        gemini_response
            .usage_metadata
            .as_ref()
            .map(|u| to_claude_usage(u, options.max_context_tokens))
            .unwrap_or_default(),
    );

    tracing::debug!(
        "[Grounding] Built web search message: query_len={} results={} blocks={}",
        grounding.query.len(),
        grounding.results.len(),
        content.len()
    );

    ClaudeResponse::new(
        response_id(gemini_response),
        reported_model(gemini_response, options),
        content,
        stop_reason,
        usage,
    )
}
