// Grounding (web search) assembly
// Gemini groundingMetadata -> Claude server_tool_use / web_search_tool_result / citations

mod redirect;

pub use redirect::{unwrap_google_redirect, HttpRedirectResolver, NoopRedirectResolver, RedirectResolver};

use ag2api_types::protocol::{Candidate, Citation, GroundingChunk, GroundingSupport, SearchResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

/// Name of the built-in search tool in `server_tool_use` blocks.
pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";

#[derive(Serialize)]
struct ContentHandle<'a> {
    url: &'a str,
    title: &'a str,
}

#[derive(Serialize)]
struct IndexHandle<'a> {
    url: &'a str,
    title: &'a str,
    cited_text: &'a str,
}

fn encode_handle<T: Serialize>(payload: &T) -> String {
    serde_json::to_vec(payload).map(|json| STANDARD.encode(json)).unwrap_or_default()
}

/// Opaque, deterministic `encrypted_content` for a result. Not a security
/// mechanism; clients only echo it back.
pub fn stable_encrypted_content(url: &str, title: &str) -> String {
    encode_handle(&ContentHandle { url, title })
}

fn stable_encrypted_index(url: &str, title: &str, cited_text: &str) -> String {
    encode_handle(&IndexHandle { url, title, cited_text })
}

/// Map grounding chunks to search results, dropping entries with neither url
/// nor title. Positions of kept entries are what citation indices refer to.
pub fn to_search_results(chunks: &[GroundingChunk]) -> Vec<SearchResult> {
    chunks
        .iter()
        .filter_map(|chunk| {
            let web = chunk.web.as_ref();
            let url = web.and_then(|w| w.uri.clone()).unwrap_or_default();
            let title = web
                .and_then(|w| w.title.clone().or_else(|| w.domain.clone()))
                .unwrap_or_default();
            if url.is_empty() && title.is_empty() {
                return None;
            }
            Some(SearchResult {
                encrypted_content: stable_encrypted_content(&url, &title),
                title,
                url,
                page_age: None,
            })
        })
        .collect()
}

/// Citations for one support: one per resolvable chunk index, none when the
/// support has no cited text.
pub fn build_citations(results: &[SearchResult], support: &GroundingSupport) -> Vec<Citation> {
    let Some(cited_text) = support
        .segment
        .as_ref()
        .and_then(|s| s.text.as_deref())
        .filter(|t| !t.is_empty())
    else {
        return Vec::new();
    };

    support
        .grounding_chunk_indices
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|idx| usize::try_from(*idx).ok())
        .filter_map(|idx| results.get(idx))
        .map(|result| Citation {
            cited_text: cited_text.to_string(),
            url: result.url.clone(),
            title: result.title.clone(),
            encrypted_index: stable_encrypted_index(&result.url, &result.title, cited_text),
        })
        .collect()
}

/// Resolve every result URL concurrently and refresh the handles of the
/// ones that changed.
pub async fn resolve_result_urls(results: &mut [SearchResult], resolver: &dyn RedirectResolver) {
    if results.is_empty() {
        return;
    }

    let resolved = futures::future::join_all(results.iter().map(|r| async move {
        if r.url.is_empty() {
            None
        } else {
            Some(resolver.resolve(&r.url).await)
        }
    }))
    .await;

    for (result, resolved) in results.iter_mut().zip(resolved) {
        if let Some(url) = resolved.filter(|u| !u.is_empty() && *u != result.url) {
            result.url = url;
            result.encrypted_content = stable_encrypted_content(&result.url, &result.title);
        }
    }
}

/// Grounding data gathered for one response.
#[derive(Debug, Clone, Default)]
pub struct GroundingData {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub supports: Vec<GroundingSupport>,
}

impl GroundingData {
    pub fn from_candidate(candidate: &Candidate) -> Self {
        let mut data = Self::default();
        data.update_from_candidate(candidate);
        data
    }

    /// Overwrite whatever this candidate carries; streams usually complete
    /// the metadata only on the last chunk.
    pub fn update_from_candidate(&mut self, candidate: &Candidate) {
        if let Some(query) = candidate.web_search_query() {
            self.query = query.to_string();
        }
        if let Some(chunks) = candidate.effective_grounding_chunks() {
            self.results = to_search_results(chunks);
        }
        if let Some(supports) = candidate.effective_grounding_supports() {
            self.supports = supports.to_vec();
        }
    }

    /// Citation groups in support order, skipping supports without any.
    pub fn citation_groups(&self) -> Vec<Vec<Citation>> {
        self.supports
            .iter()
            .map(|s| build_citations(&self.results, s))
            .filter(|c| !c.is_empty())
            .collect()
    }
}

/// Whether a complete document should take the grounding path.
pub fn is_grounded_document(candidate: &Candidate) -> bool {
    let meta = candidate.grounding_metadata.as_ref();
    candidate.web_search_query().is_some()
        || candidate.grounding_chunks.is_some()
        || candidate.grounding_supports.is_some()
        || meta.is_some_and(|m| m.grounding_chunks.is_some() || m.grounding_supports.is_some())
}
