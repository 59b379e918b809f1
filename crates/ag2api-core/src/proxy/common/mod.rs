//! Common utilities module
//!
//! Shared helpers for handlers and mappers.

pub mod client_builder;
pub mod random_id;

pub use client_builder::build_http_client;
pub use random_id::{generate_message_id, generate_random_id, generate_server_tool_id, generate_tool_use_id};
