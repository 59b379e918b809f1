// Claude mapper module
// Handles Gemini-internal → Claude Messages response transformation

pub mod collector;
pub mod envelope;
pub mod grounding;
pub mod options;
pub mod part;
pub mod response;
pub mod sse_stream;
pub mod streaming;
pub mod usage;

#[cfg(test)]
mod collector_tests;

pub use collector::collect_stream_to_json;
pub use envelope::{parse_gemini_document, unwrap_envelope};
pub use options::{CompletionReport, TransformOptions, UsageHolder};
pub use part::{classify_parts, SourcePart};
pub use response::{transform_response, transform_response_body, NonStreamingProcessor};
pub use sse_stream::{create_claude_sse_stream, emit_force_stop, MAX_LINE_BYTES};
pub use streaming::{PartProcessor, StreamingState};
pub use usage::{to_claude_usage, to_claude_usage_with_policy, with_web_search_request, CacheSplitPolicy};
