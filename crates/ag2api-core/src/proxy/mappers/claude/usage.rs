// Usage mapping: Gemini usageMetadata -> Claude usage

// The cache split is a ratio heuristic over bounded u32 token counts.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::as_conversions,
    clippy::arithmetic_side_effects,
    reason = "Usage split heuristic: bounded u32 values, intentional f64 math"
)]

use ag2api_types::protocol::{ServerToolUsage, Usage, UsageMetadata};

/// Prompts at or below this size are reported as plain input.
const MIN_SPLIT_PROMPT_TOKENS: u32 = 100;

/// Ratios of the three-way prompt split.
///
/// The upstream never reports how much of a prompt was freshly cached versus
/// read from cache, so these numbers are an approximation and may be tuned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheSplitPolicy {
    /// Share of the prompt reported as `input_tokens`.
    pub input_share: f64,
    /// `cache_creation_input_tokens` share at zero context utilization.
    pub creation_share_idle: f64,
    /// `cache_creation_input_tokens` share at full context utilization.
    pub creation_share_full: f64,
}

impl Default for CacheSplitPolicy {
    fn default() -> Self {
        Self { input_share: 0.01, creation_share_idle: 0.15, creation_share_full: 0.04 }
    }
}

/// Convert upstream usage with the default split policy.
pub fn to_claude_usage(usage_metadata: &UsageMetadata, max_context_tokens: Option<u32>) -> Usage {
    to_claude_usage_with_policy(usage_metadata, max_context_tokens, &CacheSplitPolicy::default())
}

pub fn to_claude_usage_with_policy(
    usage_metadata: &UsageMetadata,
    max_context_tokens: Option<u32>,
    policy: &CacheSplitPolicy,
) -> Usage {
    let prompt = usage_metadata.prompt_token_count;
    let total = usage_metadata.total_token_count;

    let output_tokens = if total > 0 && total >= prompt {
        total - prompt
    } else {
        usage_metadata.candidates_token_count.saturating_add(usage_metadata.thoughts_token_count)
    };

    let max_context = max_context_tokens.filter(|m| *m > 0);
    let Some(max_context) = max_context.filter(|_| prompt > MIN_SPLIT_PROMPT_TOKENS) else {
        return Usage { input_tokens: prompt, output_tokens, ..Usage::default() };
    };

    let utilization = (prompt as f64 / max_context as f64).min(1.0);
    let creation_share = policy.creation_share_idle
        - (policy.creation_share_idle - policy.creation_share_full) * utilization;

    let input_tokens = ((prompt as f64 * policy.input_share).floor() as u32).min(prompt);
    let creation = ((prompt as f64 * creation_share).floor() as u32).min(prompt - input_tokens);
    let read = prompt - input_tokens - creation;

    tracing::debug!(
        "[Usage] prompt={} max_context={} u={:.3} -> input={} creation={} read={}",
        prompt,
        max_context,
        utilization,
        input_tokens,
        creation,
        read
    );

    Usage {
        input_tokens,
        output_tokens,
        cache_creation_input_tokens: Some(creation),
        cache_read_input_tokens: Some(read),
        server_tool_use: None,
    }
}

/// Mark a usage object as belonging to a grounded (web search) turn.
pub fn with_web_search_request(mut usage: Usage) -> Usage {
    usage.server_tool_use = Some(ServerToolUsage { web_search_requests: 1 });
    usage
}
