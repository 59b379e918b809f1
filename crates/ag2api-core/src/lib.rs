//! # ag2api Core
//!
//! Response transformation engine of the ag2api gateway: turns Gemini-internal
//! generation output (one JSON document or a live SSE stream) into wire-exact
//! Claude Messages output.
//!
//! ## Layout
//!
//! ```text
//! ag2api-core/src/
//! ├── modules/              # logger, config loading
//! └── proxy/
//!     ├── common/           # random ids, HTTP client builder
//!     ├── signature_store   # tool-call id -> thought signature
//!     ├── upstream/         # upstream response + body fan-out
//!     ├── handlers/claude/  # response-out handler, debug taps
//!     └── mappers/
//!         ├── mcp_xml       # text -> tool call segmenter
//!         └── claude/       # usage, grounding, non-streaming, streaming, collector
//! ```

#![allow(
    clippy::significant_drop_tightening,
    reason = "RwLock guards in async code require careful lifetime management"
)]
#![allow(
    clippy::redundant_else,
    reason = "Explicit else blocks improve readability in complex control flow"
)]
#![allow(clippy::map_err_ignore, reason = "Error context is provided in the replacement message")]
#![allow(clippy::needless_continue, reason = "Explicit continue improves loop readability")]
#![allow(
    clippy::derive_partial_eq_without_eq,
    reason = "Some types intentionally don't implement Eq"
)]
// Test-only lints: allow panic!, println!, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::float_cmp,
        clippy::needless_collect,
        clippy::assertions_on_result_states
    )
)]

pub mod error;
pub mod modules;
pub mod proxy;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use modules::{init_logger, load_config};
pub use proxy::handlers::claude::{
    transform_claude_response_out, ClaudeResponseOut, OutBody, ResponseContext,
};
pub use proxy::mappers::claude::{
    collect_stream_to_json, create_claude_sse_stream, transform_response, transform_response_body,
    CompletionReport, TransformOptions, UsageHolder,
};
pub use proxy::upstream::UpstreamResponse;
pub use proxy::{
    HttpRedirectResolver, InMemoryToolSignatureStore, NoopRedirectResolver, RedirectResolver,
    ToolSignatureStore, TransformServices,
};
