//! Shared data models for ag2api.

mod config;

pub use config::{
    GatewayConfig, LogConfig, RedirectConfig, TransformConfig, DEFAULT_REDIRECT_PREFIX,
};
