//! Proxy module - response side of the Claude-compatible gateway
//!
//! This module provides:
//! - Gemini-internal -> Claude Messages response transformation (JSON and SSE)
//! - Process-wide tool signature store and redirect resolver services
//! - Upstream body fan-out for side-channel debug taps
//! - The response-out handler that glues the above together

pub mod common;
pub mod handlers;
pub mod mappers;
pub mod services;
pub mod signature_store;
pub mod upstream;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use mappers::claude::grounding::{HttpRedirectResolver, NoopRedirectResolver, RedirectResolver};
pub use services::TransformServices;
pub use signature_store::{InMemoryToolSignatureStore, ToolSignatureStore};
