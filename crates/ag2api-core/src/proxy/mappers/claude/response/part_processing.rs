// Part processing for NonStreamingProcessor

use ag2api_types::protocol::ContentBlock;
use serde_json::Value;

use super::{NonStreamingProcessor, OpenBlock};
use crate::proxy::common::random_id::generate_tool_use_id;
use crate::proxy::mappers::claude::part::SourcePart;
use crate::proxy::mappers::mcp_xml::Segment;

impl NonStreamingProcessor<'_> {
    pub(super) fn process_part(&mut self, part: SourcePart) {
        if !part.is_call() && !part.is_empty_thought() {
            self.pending_tool_signature = None;
        }

        match part {
            SourcePart::Thinking { text, signature } => self.process_thinking(&text, signature),
            SourcePart::Answer { text, signature } => self.process_answer(text, signature),
            SourcePart::Call { name, args, id, signature } => {
                self.process_function_call(name, args, id, signature)
            },
        }
    }

    /// End of parts: drain the segmenter, the trailing signature and the open block.
    pub(super) fn finish_parts(&mut self) {
        if let Some(mut segmenter) = self.segmenter.take() {
            let rest = segmenter.flush();
            self.apply_segments(rest);
        }
        self.flush_trailing_signature();
        self.close_block();
    }

    fn process_thinking(&mut self, text: &str, signature: Option<String>) {
        self.flush_trailing_signature();

        if !matches!(self.open, OpenBlock::Thinking { .. }) {
            self.close_block();
            self.open = OpenBlock::Thinking { text: String::new(), signature: None };
        }

        if let OpenBlock::Thinking { text: builder, signature: current } = &mut self.open {
            builder.push_str(text);
            if let Some(sig) = signature {
                if text.is_empty() {
                    self.pending_tool_signature = Some(sig.clone());
                }
                *current = Some(sig);
            }
        }
    }

    fn process_answer(&mut self, text: String, signature: Option<String>) {
        if text.is_empty() {
            if let Some(sig) = signature {
                self.flush_trailing_signature();
                self.trailing_signature = Some(sig);
            }
            return;
        }

        self.flush_trailing_signature();

        if let Some(sig) = signature {
            if self.options.rehome_allowed(self.has_thinking) {
                self.close_block();
                self.content_blocks.push(ContentBlock::text(text));
                self.push_signature_carrier(sig);
                return;
            }
            tracing::debug!(
                "[Claude-Response] Dropping answer signature (len={}) in response without thinking",
                sig.len()
            );
        }

        match self.segmenter.as_mut() {
            Some(segmenter) => {
                let segments = segmenter.push_text(&text);
                self.apply_segments(segments);
            },
            None => self.append_text(&text),
        }
    }

    fn apply_segments(&mut self, segments: Vec<Segment>) {
        for segment in segments {
            match segment {
                Segment::Text(text) if !text.is_empty() => self.append_text(&text),
                Segment::Text(_) => {},
                Segment::Tool { name, input } => {
                    self.process_function_call(name, Some(input), None, None)
                },
            }
        }
    }

    fn process_function_call(
        &mut self,
        name: String,
        args: Option<Value>,
        id: Option<String>,
        signature: Option<String>,
    ) {
        self.flush_trailing_signature();

        let sig_for_store = signature.clone().or_else(|| self.pending_tool_signature.take());
        self.pending_tool_signature = None;

        if let Some(sig) = signature {
            match &mut self.open {
                OpenBlock::Thinking { signature: current, .. } if current.is_none() => {
                    *current = Some(sig)
                },
                _ => {
                    self.close_block();
                    self.push_signature_carrier(sig);
                },
            }
        }
        self.close_block();

        let tool_id = id.unwrap_or_else(generate_tool_use_id);
        if let Some(sig) = sig_for_store {
            self.tool_signatures.remember(&tool_id, &sig);
        }

        self.has_tool_call = true;
        self.content_blocks.push(ContentBlock::ToolUse {
            id: tool_id,
            name,
            input: args.unwrap_or_else(|| Value::Object(Default::default())),
        });
    }

    fn append_text(&mut self, text: &str) {
        if !matches!(self.open, OpenBlock::Text(_)) {
            self.close_block();
            self.open = OpenBlock::Text(String::new());
        }
        if let OpenBlock::Text(builder) = &mut self.open {
            builder.push_str(text);
        }
    }

    /// Materialize the open builder, if any.
    fn close_block(&mut self) {
        match std::mem::take(&mut self.open) {
            OpenBlock::None => {},
            OpenBlock::Text(text) => {
                if !text.is_empty() {
                    self.content_blocks.push(ContentBlock::text(text));
                }
            },
            OpenBlock::Thinking { text, signature } => {
                self.content_blocks.push(ContentBlock::thinking(text, signature));
            },
        }
    }

    /// Re-home a buffered empty-answer signature before the next block.
    fn flush_trailing_signature(&mut self) {
        if let Some(sig) = self.trailing_signature.take() {
            self.close_block();
            self.push_signature_carrier(sig);
        }
    }

    fn push_signature_carrier(&mut self, signature: String) {
        if self.options.rehome_allowed(self.has_thinking) {
            self.content_blocks.push(ContentBlock::signature_carrier(signature));
        } else {
            tracing::debug!(
                "[Claude-Response] Dropping stray signature (len={}) in response without thinking",
                signature.len()
            );
        }
    }
}
