//! Process-level modules: logging setup and configuration loading.

pub mod config;
pub mod logger;

pub use config::{apply_env_overrides, load_config, parse_bool};
pub use logger::{cleanup_old_logs, init_logger};
