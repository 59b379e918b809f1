//! Protocol definitions for the two sides of the gateway.
//!
//! - **`gemini`** - Gemini-internal generation responses as the upstream emits them
//! - **`claude`** - Claude Messages response documents as clients expect them
//!
//! Only the response direction is modelled; request bodies are produced
//! elsewhere and never inspected by the transformation engine.

pub mod claude;
pub mod gemini;

pub use claude::{
    Citation, ClaudeResponse, ContentBlock, SearchResult, ServerToolUsage, StopReason, Usage,
};
pub use gemini::{
    Candidate, FunctionCall, GeminiContent, GeminiPart, GeminiResponse, GroundingChunk,
    GroundingMetadata, GroundingSupport, InlineData, TextSegment, UsageMetadata, WebSource,
};
