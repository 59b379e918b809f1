//! Gemini-internal generation response types.
//!
//! Every field is optional: the upstream omits whatever it has nothing to say
//! about, and streaming chunks routinely carry only a fragment of a candidate.

use serde::{Deserialize, Serialize};

/// One generation response, or one SSE chunk of a streamed response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiResponse {
    /// List of response candidates. Only the first one is ever transformed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Candidate>>,
    /// Token usage metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "usageMetadata")]
    pub usage_metadata: Option<UsageMetadata>,
    /// Version of the model that generated this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "modelVersion")]
    pub model_version: Option<String>,
    /// Unique identifier for this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "responseId")]
    pub response_id: Option<String>,
    /// Error object the upstream sometimes injects into a running stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl GeminiResponse {
    /// The first candidate, if any.
    pub fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.as_ref().and_then(|c| c.first())
    }
}

/// A single candidate response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    /// The content of this candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<GeminiContent>,
    /// Reason why generation finished (`STOP`, `MAX_TOKENS`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
    /// Index of this candidate in the list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Grounding metadata for search-augmented responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "groundingMetadata")]
    pub grounding_metadata: Option<GroundingMetadata>,
    /// Grounding chunks hoisted to candidate level (older upstream shape).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "groundingChunks")]
    pub grounding_chunks: Option<Vec<GroundingChunk>>,
    /// Grounding supports hoisted to candidate level (older upstream shape).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "groundingSupports")]
    pub grounding_supports: Option<Vec<GroundingSupport>>,
}

impl Candidate {
    /// Parts of this candidate, empty when the content is absent.
    pub fn parts(&self) -> &[GeminiPart] {
        self.content.as_ref().map(|c| c.parts.as_slice()).unwrap_or_default()
    }

    /// Whether any grounding field is present on this candidate at all.
    pub fn carries_grounding(&self) -> bool {
        self.grounding_metadata.is_some()
            || self.grounding_chunks.is_some()
            || self.grounding_supports.is_some()
    }

    /// First web search query, if the metadata carries one.
    pub fn web_search_query(&self) -> Option<&str> {
        self.grounding_metadata
            .as_ref()
            .and_then(|m| m.web_search_queries.as_ref())
            .and_then(|q| q.first())
            .map(String::as_str)
    }

    /// Grounding chunks, preferring the candidate-level copy.
    pub fn effective_grounding_chunks(&self) -> Option<&[GroundingChunk]> {
        self.grounding_chunks.as_deref().or_else(|| {
            self.grounding_metadata.as_ref().and_then(|m| m.grounding_chunks.as_deref())
        })
    }

    /// Grounding supports, preferring the candidate-level copy.
    pub fn effective_grounding_supports(&self) -> Option<&[GroundingSupport]> {
        self.grounding_supports.as_deref().or_else(|| {
            self.grounding_metadata.as_ref().and_then(|m| m.grounding_supports.as_deref())
        })
    }
}

/// Gemini content structure containing role and parts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiContent {
    /// The role of the content author (e.g., "model").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// The parts that make up this content.
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A single raw part as the upstream sends it.
///
/// The engine converts this into a tagged part once, at the parse boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiPart {
    /// Optional text content. Present-but-empty is meaningful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Whether this is a thought/reasoning part.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
    /// Opaque signature bound to this exact part.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "thoughtSignature")]
    pub thought_signature: Option<String>,
    /// Function call request from the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "functionCall")]
    pub function_call: Option<FunctionCall>,
    /// Inline binary data (images).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "inlineData")]
    pub inline_data: Option<InlineData>,
}

/// Function call request from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function to call.
    pub name: String,
    /// Optional unique identifier for this call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Optional arguments to pass to the function.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
}

/// Inline binary data with MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineData {
    /// MIME type of the data (e.g., "image/png").
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Base64-encoded binary data.
    #[serde(default)]
    pub data: String,
}

/// Token usage metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    /// Number of tokens in the prompt.
    #[serde(default, rename = "promptTokenCount")]
    pub prompt_token_count: u32,
    /// Number of tokens in the response candidates.
    #[serde(default, rename = "candidatesTokenCount")]
    pub candidates_token_count: u32,
    /// Number of reasoning tokens.
    #[serde(default, rename = "thoughtsTokenCount")]
    pub thoughts_token_count: u32,
    /// Number of tokens served from the upstream context cache.
    #[serde(default, rename = "cachedContentTokenCount")]
    pub cached_content_token_count: u32,
    /// Total token count.
    #[serde(default, rename = "totalTokenCount")]
    pub total_token_count: u32,
}

/// Metadata about grounding sources used in a response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundingMetadata {
    /// Web search queries that were executed.
    #[serde(rename = "webSearchQueries")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search_queries: Option<Vec<String>>,
    /// Chunks of grounding information from web sources.
    #[serde(rename = "groundingChunks")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_chunks: Option<Vec<GroundingChunk>>,
    /// Support information linking response to sources.
    #[serde(rename = "groundingSupports")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_supports: Option<Vec<GroundingSupport>>,
}

/// A chunk of grounding information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundingChunk {
    /// Web source for this chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web: Option<WebSource>,
}

/// A web source used for grounding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebSource {
    /// URI of the web source, usually an opaque redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Title of the web page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Domain of the web page, used when the title is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Support information linking a response segment to sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundingSupport {
    /// Text segment in the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<TextSegment>,
    /// Indices into the grounding chunk list.
    #[serde(rename = "groundingChunkIndices")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_chunk_indices: Option<Vec<i64>>,
    /// Confidence scores for each supporting chunk.
    #[serde(rename = "confidenceScores")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_scores: Option<Vec<f64>>,
}

/// A segment of text in the response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextSegment {
    /// Start index of the segment.
    #[serde(rename = "startIndex")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<i64>,
    /// End index of the segment.
    #[serde(rename = "endIndex")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_index: Option<i64>,
    /// Text content of the segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
