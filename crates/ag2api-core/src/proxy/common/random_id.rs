//! Random identifiers for synthesized messages and tool calls.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{Rng, RngCore};

/// Lowercase alphanumeric token of the given length.
pub fn generate_random_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Tool use id shaped like the official ones: 128 random bits, base64url.
pub fn generate_tool_use_id() -> String {
    let mut bytes = [0_u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("toolu_vrtx_{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Id for the built-in web search `server_tool_use` block.
pub fn generate_server_tool_id() -> String {
    format!("srvtoolu_{}", generate_random_id(24))
}

/// Fallback message id when the upstream sends no `responseId`.
pub fn generate_message_id() -> String {
    format!("msg_{}", generate_random_id(12))
}
