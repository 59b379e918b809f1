//! Process-wide collaborators injected into every transformation.

use std::sync::Arc;

use ag2api_types::RedirectConfig;

use super::mappers::claude::grounding::{HttpRedirectResolver, NoopRedirectResolver, RedirectResolver};
use super::signature_store::{InMemoryToolSignatureStore, ToolSignatureStore};

/// Shared services, built once per process and cloned into each response.
#[derive(Clone)]
pub struct TransformServices {
    pub tool_signatures: Arc<dyn ToolSignatureStore>,
    pub redirects: Arc<dyn RedirectResolver>,
}

impl TransformServices {
    pub fn new(
        tool_signatures: Arc<dyn ToolSignatureStore>,
        redirects: Arc<dyn RedirectResolver>,
    ) -> Self {
        Self { tool_signatures, redirects }
    }

    /// In-memory signature store plus an HTTP resolver (or a no-op one when
    /// resolution is disabled).
    pub fn from_config(config: &RedirectConfig) -> Result<Self, String> {
        let redirects: Arc<dyn RedirectResolver> = if config.enabled {
            Arc::new(HttpRedirectResolver::new(config)?)
        } else {
            Arc::new(NoopRedirectResolver)
        };
        Ok(Self::new(Arc::new(InMemoryToolSignatureStore::new()), redirects))
    }

    /// Services that never touch the network.
    pub fn offline() -> Self {
        Self::new(Arc::new(InMemoryToolSignatureStore::new()), Arc::new(NoopRedirectResolver))
    }
}

impl std::fmt::Debug for TransformServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformServices").finish_non_exhaustive()
    }
}
