//! Claude protocol handlers
//!
//! Turns an upstream call result into the response the client receives:
//! passthrough for upstream failures, transformed SSE or JSON otherwise.

mod debug_taps;
mod response_handler;

pub use debug_taps::save_raw_response;
pub use response_handler::{transform_claude_response_out, ClaudeResponseOut, OutBody, ResponseContext};
