//! Tool-call id -> thought signature store.
//!
//! Signatures that arrive on function-call parts (or on the empty thought part
//! right before one) must be echoed back upstream when the client replays the
//! tool call on its next turn. The response side remembers them here; the
//! request side looks them up.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Turn-spanning signature store keyed by tool-call id.
pub trait ToolSignatureStore: Send + Sync {
    /// Upsert the signature for a tool call. Empty signatures are ignored.
    fn remember(&self, tool_call_id: &str, signature: &str);

    /// Signature previously remembered for a tool call.
    fn lookup(&self, tool_call_id: &str) -> Option<String>;
}

/// Process-lifetime in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryToolSignatureStore {
    signatures: RwLock<HashMap<String, String>>,
}

impl InMemoryToolSignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.signatures.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.read().is_empty()
    }
}

impl ToolSignatureStore for InMemoryToolSignatureStore {
    fn remember(&self, tool_call_id: &str, signature: &str) {
        if tool_call_id.is_empty() || signature.is_empty() {
            return;
        }
        tracing::debug!(
            "[ToolSig] Caching signature for tool id {} (len={})",
            tool_call_id,
            signature.len()
        );
        self.signatures.write().insert(tool_call_id.to_string(), signature.to_string());
    }

    fn lookup(&self, tool_call_id: &str) -> Option<String> {
        self.signatures.read().get(tool_call_id).cloned()
    }
}
