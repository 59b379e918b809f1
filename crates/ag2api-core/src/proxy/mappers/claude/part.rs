//! Tagged view of upstream parts.
//!
//! Raw parts are a bag of optional fields; they are classified here once and
//! the transformers only ever see [`SourcePart`].

use ag2api_types::protocol::GeminiPart;
use serde_json::Value;

/// One upstream part, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePart {
    Thinking { text: String, signature: Option<String> },
    Answer { text: String, signature: Option<String> },
    Call { name: String, args: Option<Value>, id: Option<String>, signature: Option<String> },
}

impl SourcePart {
    /// Classify a raw part. Parts with nothing to emit yield `None`.
    pub fn from_gemini(part: &GeminiPart) -> Option<Self> {
        let signature = part.thought_signature.clone().filter(|s| !s.is_empty());

        if let Some(fc) = &part.function_call {
            return Some(Self::Call {
                name: fc.name.clone(),
                args: fc.args.clone(),
                id: fc.id.clone().filter(|id| !id.is_empty()),
                signature,
            });
        }

        if let Some(text) = &part.text {
            return Some(if part.thought.unwrap_or(false) {
                Self::Thinking { text: text.clone(), signature }
            } else {
                Self::Answer { text: text.clone(), signature }
            });
        }

        if let Some(img) = part.inline_data.as_ref().filter(|img| !img.data.is_empty()) {
            let text = format!("![image](data:{};base64,{})", img.mime_type, img.data);
            return Some(Self::Answer { text, signature });
        }

        None
    }

    pub fn signature(&self) -> Option<&str> {
        match self {
            Self::Thinking { signature, .. }
            | Self::Answer { signature, .. }
            | Self::Call { signature, .. } => signature.as_deref(),
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. })
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self, Self::Thinking { .. })
    }

    /// Zero-length thought part; its signature may belong to the next call.
    pub fn is_empty_thought(&self) -> bool {
        matches!(self, Self::Thinking { text, .. } if text.is_empty())
    }
}

/// Classify every part of a candidate, dropping the empty ones.
pub fn classify_parts(parts: &[GeminiPart]) -> Vec<SourcePart> {
    parts.iter().filter_map(SourcePart::from_gemini).collect()
}
