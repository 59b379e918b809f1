//! # ag2api Types
//!
//! Core types, models, and error definitions for the ag2api gateway.
//!
//! This crate provides the foundational type system for the workspace:
//!
//! - **`error`** - Typed errors for response transformation and configuration
//! - **`models`** - Gateway configuration model
//! - **`protocol`** - Gemini-internal (upstream) and Claude Messages (target) wire types
//!
//! ## Architecture Role
//!
//! `ag2api-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          ag2api-types (this crate)
//!                  │
//!                  ▼
//!             ag2api-core
//!                  │
//!                  ▼
//!             ag2api-cli
//! ```
//!
//! Nothing in here performs I/O.

pub mod error;
pub mod models;
pub mod protocol;

// Re-export error types for convenience
pub use error::{ConfigError, TransformError};

// Re-export core model types
pub use models::{GatewayConfig, LogConfig, RedirectConfig, TransformConfig};
