//! Claude Messages response types.
//!
//! These are the blocks and documents the gateway hands back to clients.
//! Serialized shapes follow the Messages API byte for byte where clients
//! are known to be strict (e.g. `stop_sequence` is always present as `null`).

use serde::{Deserialize, Serialize};

/// Content block of an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    /// Plain text, optionally carrying web search citations.
    #[serde(rename = "text")]
    Text {
        /// The text content.
        text: String,
        /// Citations backing this text.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        citations: Option<Vec<Citation>>,
    },

    /// Thinking/reasoning block. May be empty purely to carry a signature.
    #[serde(rename = "thinking")]
    Thinking {
        /// The thinking/reasoning text.
        thinking: String,
        /// Opaque upstream signature re-homed into this block.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },

    /// Tool use request from the model. Never carries a signature.
    #[serde(rename = "tool_use")]
    ToolUse {
        /// Unique identifier for this tool use.
        id: String,
        /// Name of the tool being called.
        name: String,
        /// Input arguments for the tool.
        input: serde_json::Value,
    },

    /// Built-in server tool use (web search).
    #[serde(rename = "server_tool_use")]
    ServerToolUse {
        /// Unique identifier for this tool use.
        id: String,
        /// Name of the server tool.
        name: String,
        /// Input arguments for the tool.
        input: serde_json::Value,
    },

    /// Web search tool result.
    #[serde(rename = "web_search_tool_result")]
    WebSearchToolResult {
        /// ID of the server tool use this result answers.
        tool_use_id: String,
        /// Search results.
        content: Vec<SearchResult>,
    },
}

impl ContentBlock {
    /// Plain text block without citations.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into(), citations: None }
    }

    /// Thinking block with an optional signature.
    pub fn thinking(thinking: impl Into<String>, signature: Option<String>) -> Self {
        Self::Thinking { thinking: thinking.into(), signature }
    }

    /// Zero-length thinking block carrying only a signature.
    pub fn signature_carrier(signature: impl Into<String>) -> Self {
        Self::Thinking { thinking: String::new(), signature: Some(signature.into()) }
    }

    /// Wire name of the block type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Thinking { .. } => "thinking",
            Self::ToolUse { .. } => "tool_use",
            Self::ServerToolUse { .. } => "server_tool_use",
            Self::WebSearchToolResult { .. } => "web_search_tool_result",
        }
    }
}

/// One web search result inside a `web_search_tool_result` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "web_search_result")]
pub struct SearchResult {
    /// Page title (falls back to the source domain).
    pub title: String,
    /// Landing URL, resolved from the upstream redirect when possible.
    pub url: String,
    /// Opaque handle derived from url and title.
    pub encrypted_content: String,
    /// Always null; the upstream never reports page age.
    pub page_age: Option<String>,
}

/// A citation pointing at one search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "web_search_result_location")]
pub struct Citation {
    /// The answer text this citation backs.
    pub cited_text: String,
    /// URL of the cited result.
    pub url: String,
    /// Title of the cited result.
    pub title: String,
    /// Opaque handle derived from url, title and cited text.
    pub encrypted_index: String,
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the turn.
    EndTurn,
    /// Output was cut off by the token limit.
    MaxTokens,
    /// The model wants a tool to run.
    ToolUse,
}

impl StopReason {
    /// Wire name of the stop reason.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EndTurn => "end_turn",
            Self::MaxTokens => "max_tokens",
            Self::ToolUse => "tool_use",
        }
    }
}

/// Server tool usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerToolUsage {
    /// Number of web searches performed for this turn.
    pub web_search_requests: u32,
}

/// Token usage in the Messages API shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_tool_use: Option<ServerToolUsage>,
}

/// A complete assistant message document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudeResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub role: String,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

impl ClaudeResponse {
    /// Assistant message with the fixed `type`/`role` fields filled in.
    pub fn new(
        id: String,
        model: String,
        content: Vec<ContentBlock>,
        stop_reason: StopReason,
        usage: Usage,
    ) -> Self {
        Self {
            id,
            type_: "message".to_string(),
            role: "assistant".to_string(),
            model,
            content,
            stop_reason,
            stop_sequence: None,
            usage,
        }
    }
}
