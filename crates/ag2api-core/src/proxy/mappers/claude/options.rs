//! Per-response options and the post-completion usage handle.

use std::sync::Arc;

use ag2api_types::protocol::{Usage, UsageMetadata};
use ag2api_types::TransformConfig;
use parking_lot::Mutex;

use super::usage::to_claude_usage;
use crate::proxy::mappers::mcp_xml::{McpXmlSegmenter, McpXmlStreamParser};

/// Options for one response transformation.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Model name reported to the client instead of the upstream's.
    pub override_model: Option<String>,
    /// Context window of the requested model, drives the usage split.
    pub max_context_tokens: Option<u32>,
    /// Tool names the MCP-XML segmenter recognises.
    pub mcp_tool_names: Vec<String>,
    pub mcp_xml_enabled: bool,
    /// Drop stray signatures when the response contains no thinking.
    pub drop_orphan_signatures: bool,
    /// Receives the final usage for post-completion reporting.
    pub usage_holder: Option<UsageHolder>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            override_model: None,
            max_context_tokens: None,
            mcp_tool_names: Vec::new(),
            mcp_xml_enabled: false,
            drop_orphan_signatures: true,
            usage_holder: None,
        }
    }
}

impl TransformOptions {
    pub fn from_config(config: &TransformConfig) -> Self {
        Self {
            mcp_xml_enabled: config.mcp_xml_enabled,
            drop_orphan_signatures: config.drop_orphan_signatures,
            ..Self::default()
        }
    }

    /// Fresh segmenter for one response, if MCP-XML bridging applies.
    pub fn segmenter(&self) -> Option<Box<dyn McpXmlSegmenter>> {
        if self.mcp_xml_enabled && !self.mcp_tool_names.is_empty() {
            Some(Box::new(McpXmlStreamParser::new(&self.mcp_tool_names)))
        } else {
            None
        }
    }

    /// Whether a stray signature may be re-homed given the thinking seen.
    pub(crate) fn rehome_allowed(&self, has_thinking: bool) -> bool {
        has_thinking || !self.drop_orphan_signatures
    }
}

/// What the caller gets after the last byte: model and best-effort usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub model: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Default)]
struct UsageSnapshot {
    model: Option<String>,
    usage_metadata: Option<UsageMetadata>,
    max_context_tokens: Option<u32>,
}

/// Cloneable handle the transformers write usage into.
///
/// Safe to read at any time, including after a stream ended abnormally.
#[derive(Debug, Clone, Default)]
pub struct UsageHolder {
    inner: Arc<Mutex<UsageSnapshot>>,
}

impl UsageHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_model(&self, model: &str) {
        if !model.is_empty() {
            self.inner.lock().model = Some(model.to_string());
        }
    }

    pub(crate) fn record_usage(&self, usage: &UsageMetadata, max_context_tokens: Option<u32>) {
        let mut guard = self.inner.lock();
        guard.usage_metadata = Some(*usage);
        guard.max_context_tokens = max_context_tokens;
    }

    pub fn report(&self) -> CompletionReport {
        let guard = self.inner.lock();
        CompletionReport {
            model: guard.model.clone().unwrap_or_default(),
            usage: guard.usage_metadata.as_ref().map(|u| to_claude_usage(u, guard.max_context_tokens)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_holder_reports_nothing() {
        let holder = UsageHolder::new();
        let report = holder.report();
        assert_eq!(report.model, "");
        assert_eq!(report.usage, None);
    }

    #[test]
    fn test_holder_clones_share_state() {
        let holder = UsageHolder::new();
        let writer = holder.clone();
        writer.record_model("gemini-2.5-pro");
        writer.record_usage(
            &UsageMetadata { prompt_token_count: 40, total_token_count: 50, ..UsageMetadata::default() },
            None,
        );
        let report = holder.report();
        assert_eq!(report.model, "gemini-2.5-pro");
        let usage = report.usage.unwrap_or_default();
        assert_eq!(usage.input_tokens, 40);
        assert_eq!(usage.output_tokens, 10);
    }

    #[test]
    fn test_segmenter_requires_names() {
        let mut options = TransformOptions { mcp_xml_enabled: true, ..TransformOptions::default() };
        assert!(options.segmenter().is_none());
        options.mcp_tool_names = vec!["search".to_string()];
        assert!(options.segmenter().is_some());
    }

    #[test]
    fn test_rehome_policy() {
        let mut options = TransformOptions::default();
        assert!(!options.rehome_allowed(false));
        assert!(options.rehome_allowed(true));
        options.drop_orphan_signatures = false;
        assert!(options.rehome_allowed(false));
    }
}
