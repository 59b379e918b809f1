#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use ag2api_types::protocol::{ContentBlock, GeminiResponse, StopReason};
use serde_json::{json, Value};

use super::*;
use crate::proxy::mappers::claude::grounding::NoopRedirectResolver;
use crate::proxy::mappers::claude::options::UsageHolder;
use crate::proxy::signature_store::InMemoryToolSignatureStore;

fn doc(parts: Value) -> GeminiResponse {
    serde_json::from_value(json!({
        "responseId": "resp_1",
        "modelVersion": "gemini-2.5-pro",
        "candidates": [{"content": {"role": "model", "parts": parts}, "finishReason": "STOP"}],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
    }))
    .unwrap()
}

fn services() -> (TransformServices, Arc<InMemoryToolSignatureStore>) {
    let store = Arc::new(InMemoryToolSignatureStore::new());
    let services = TransformServices::new(store.clone(), Arc::new(NoopRedirectResolver));
    (services, store)
}

async fn run(parts: Value) -> ClaudeResponse {
    let (services, _) = services();
    transform_response(&doc(parts), &TransformOptions::default(), &services).await
}

fn shape(content: &[ContentBlock]) -> Vec<&'static str> {
    content.iter().map(ContentBlock::type_name).collect()
}

#[tokio::test]
async fn test_thinking_then_tool_call() {
    let res = run(json!([
        {"thought": true, "text": "plan"},
        {"functionCall": {"name": "x", "args": {"a": 1}}}
    ]))
    .await;

    assert_eq!(shape(&res.content), vec!["thinking", "tool_use"]);
    assert_eq!(res.content[0], ContentBlock::thinking("plan", None));
    match &res.content[1] {
        ContentBlock::ToolUse { id, name, input } => {
            assert!(id.starts_with("toolu_vrtx_"));
            assert_eq!(name, "x");
            assert_eq!(input, &json!({"a": 1}));
        },
        other => panic!("unexpected block {:?}", other),
    }
    assert_eq!(res.stop_reason, StopReason::ToolUse);
    assert_eq!(res.id, "resp_1");
    assert_eq!(res.model, "gemini-2.5-pro");
    assert_eq!(res.usage.input_tokens, 10);
    assert_eq!(res.usage.output_tokens, 5);
}

#[tokio::test]
async fn test_empty_answer_signature_rehomed_before_tool() {
    let res = run(json!([
        {"thought": true, "text": "t"},
        {"text": "", "thoughtSignature": "SIG"},
        {"functionCall": {"name": "x", "args": {}}}
    ]))
    .await;

    assert_eq!(shape(&res.content), vec!["thinking", "thinking", "tool_use"]);
    assert_eq!(res.content[1], ContentBlock::signature_carrier("SIG"));
}

#[tokio::test]
async fn test_no_thinking_drops_every_stray_signature() {
    let (services, store) = services();
    let res = transform_response(
        &doc(json!([
            {"text": "hello", "thoughtSignature": "S1"},
            {"text": "", "thoughtSignature": "S2"},
            {"functionCall": {"name": "x", "args": {}, "id": "call_1"}, "thoughtSignature": "S3"}
        ])),
        &TransformOptions::default(),
        &services,
    )
    .await;

    assert_eq!(shape(&res.content), vec!["text", "tool_use"]);
    assert_eq!(store.lookup("call_1").as_deref(), Some("S3"));
}

#[tokio::test]
async fn test_rehoming_without_thinking_when_drop_disabled() {
    let (services, _) = services();
    let options = TransformOptions { drop_orphan_signatures: false, ..TransformOptions::default() };
    let res = transform_response(
        &doc(json!([
            {"text": "hello", "thoughtSignature": "S1"},
            {"functionCall": {"name": "x", "args": {}}, "thoughtSignature": "S3"}
        ])),
        &options,
        &services,
    )
    .await;

    assert_eq!(shape(&res.content), vec!["text", "thinking", "thinking", "tool_use"]);
    assert_eq!(res.content[1], ContentBlock::signature_carrier("S1"));
    assert_eq!(res.content[2], ContentBlock::signature_carrier("S3"));
}

#[tokio::test]
async fn test_signed_answer_forms_its_own_text_block() {
    let res = run(json!([
        {"thought": true, "text": "t"},
        {"text": "a"},
        {"text": "b", "thoughtSignature": "SIG"},
        {"text": "c"}
    ]))
    .await;

    assert_eq!(shape(&res.content), vec!["thinking", "text", "text", "thinking", "text"]);
    assert_eq!(res.content[1], ContentBlock::text("a"));
    assert_eq!(res.content[2], ContentBlock::text("b"));
    assert_eq!(res.content[3], ContentBlock::signature_carrier("SIG"));
    assert_eq!(res.content[4], ContentBlock::text("c"));
}

#[tokio::test]
async fn test_signed_answer_merges_into_text_without_thinking() {
    let res = run(json!([
        {"text": "Hello", "thoughtSignature": "S"},
        {"text": " world"}
    ]))
    .await;

    assert_eq!(shape(&res.content), vec!["text"]);
    assert_eq!(res.content[0], ContentBlock::text("Hello world"));
    assert_eq!(res.stop_reason, StopReason::EndTurn);
}

#[tokio::test]
async fn test_call_signature_attaches_to_open_thinking_block() {
    let (services, store) = services();
    let res = transform_response(
        &doc(json!([
            {"thought": true, "text": "reason"},
            {"functionCall": {"name": "x", "args": {}, "id": "call_9"}, "thoughtSignature": "FC_SIG"}
        ])),
        &TransformOptions::default(),
        &services,
    )
    .await;

    assert_eq!(shape(&res.content), vec!["thinking", "tool_use"]);
    assert_eq!(res.content[0], ContentBlock::thinking("reason", Some("FC_SIG".to_string())));
    assert_eq!(store.lookup("call_9").as_deref(), Some("FC_SIG"));
}

#[tokio::test]
async fn test_empty_thought_signature_is_cached_for_next_call() {
    let (services, store) = services();
    let res = transform_response(
        &doc(json!([
            {"thought": true, "text": "", "thoughtSignature": "PRE"},
            {"functionCall": {"name": "x", "args": {}, "id": "call_2"}}
        ])),
        &TransformOptions::default(),
        &services,
    )
    .await;

    assert_eq!(shape(&res.content), vec!["thinking", "tool_use"]);
    assert_eq!(res.content[0], ContentBlock::signature_carrier("PRE"));
    assert_eq!(store.lookup("call_2").as_deref(), Some("PRE"));
}

#[tokio::test]
async fn test_intervening_text_discards_cached_thought_signature() {
    let (services, store) = services();
    transform_response(
        &doc(json!([
            {"thought": true, "text": "", "thoughtSignature": "PRE"},
            {"text": "unrelated"},
            {"functionCall": {"name": "x", "args": {}, "id": "call_3"}}
        ])),
        &TransformOptions::default(),
        &services,
    )
    .await;

    assert_eq!(store.lookup("call_3"), None);
}

#[tokio::test]
async fn test_trailing_signature_flushed_at_end() {
    let res = run(json!([
        {"thought": true, "text": "t"},
        {"text": "answer"},
        {"text": "", "thoughtSignature": "END"}
    ]))
    .await;

    assert_eq!(shape(&res.content), vec!["thinking", "text", "thinking"]);
    assert_eq!(res.content[2], ContentBlock::signature_carrier("END"));
    assert_eq!(res.stop_reason, StopReason::EndTurn);
}

#[tokio::test]
async fn test_max_tokens_and_overrides() {
    let (services, _) = services();
    let holder = UsageHolder::new();
    let options = TransformOptions {
        override_model: Some("claude-sonnet-4-5".to_string()),
        usage_holder: Some(holder.clone()),
        ..TransformOptions::default()
    };
    let mut gemini = doc(json!([{"text": "cut"}]));
    if let Some(c) = gemini.candidates.as_mut().and_then(|c| c.first_mut()) {
        c.finish_reason = Some("MAX_TOKENS".to_string());
    }
    gemini.response_id = None;

    let res = transform_response(&gemini, &options, &services).await;
    assert_eq!(res.stop_reason, StopReason::MaxTokens);
    assert_eq!(res.model, "claude-sonnet-4-5");
    assert!(res.id.starts_with("msg_"));

    let report = holder.report();
    assert_eq!(report.model, "claude-sonnet-4-5");
    assert_eq!(report.usage.unwrap().input_tokens, 10);
}

#[tokio::test]
async fn test_inline_image_becomes_markdown_text() {
    let res = run(json!([{"inlineData": {"mimeType": "image/png", "data": "AAAA"}}])).await;
    assert_eq!(res.content, vec![ContentBlock::text("![image](data:image/png;base64,AAAA)")]);
}

#[tokio::test]
async fn test_mcp_xml_segments_become_tool_calls() {
    let (services, _) = services();
    let options = TransformOptions {
        mcp_xml_enabled: true,
        mcp_tool_names: vec!["search".to_string()],
        ..TransformOptions::default()
    };
    let res = transform_response(
        &doc(json!([
            {"text": "Looking <sea"},
            {"text": "rch>{\"q\": \"rust\"}</search> done"}
        ])),
        &options,
        &services,
    )
    .await;

    assert_eq!(shape(&res.content), vec!["text", "tool_use", "text"]);
    assert_eq!(res.content[0], ContentBlock::text("Looking "));
    match &res.content[1] {
        ContentBlock::ToolUse { name, input, .. } => {
            assert_eq!(name, "search");
            assert_eq!(input, &json!({"q": "rust"}));
        },
        other => panic!("unexpected block {:?}", other),
    }
    assert_eq!(res.stop_reason, StopReason::ToolUse);
}

#[tokio::test]
async fn test_grounded_document_builds_web_search_message() {
    let (services, _) = services();
    let gemini: GeminiResponse = serde_json::from_value(json!({
        "candidates": [{
            "content": {"parts": [
                {"thought": true, "text": "searching"},
                {"text": "Rust is "},
                {"text": "fast."}
            ]},
            "finishReason": "STOP",
            "groundingMetadata": {
                "webSearchQueries": ["is rust fast"],
                "groundingChunks": [{"web": {
                    "uri": "https://vertexaisearch.cloud.google.com/grounding-api-redirect/1",
                    "title": "Ex"
                }}],
                "groundingSupports": [
                    {"segment": {"text": "Rust is fast."}, "groundingChunkIndices": [0]},
                    {"segment": {"text": "orphan"}, "groundingChunkIndices": [4]}
                ]
            }
        }],
        "usageMetadata": {"promptTokenCount": 3, "totalTokenCount": 9}
    }))
    .unwrap();

    let res = transform_response(&gemini, &TransformOptions::default(), &services).await;

    assert_eq!(
        shape(&res.content),
        vec!["thinking", "server_tool_use", "web_search_tool_result", "text", "text"]
    );
    let tool_id = match &res.content[1] {
        ContentBlock::ServerToolUse { id, name, input } => {
            assert!(id.starts_with("srvtoolu_"));
            assert_eq!(name, "web_search");
            assert_eq!(input, &json!({"query": "is rust fast"}));
            id.clone()
        },
        other => panic!("unexpected block {:?}", other),
    };
    match &res.content[2] {
        ContentBlock::WebSearchToolResult { tool_use_id, content } => {
            assert_eq!(tool_use_id, &tool_id);
            assert_eq!(content.len(), 1);
            assert_eq!(
                content[0].url,
                "https://vertexaisearch.cloud.google.com/grounding-api-redirect/1"
            );
        },
        other => panic!("unexpected block {:?}", other),
    }
    match &res.content[3] {
        ContentBlock::Text { text, citations } => {
            assert!(text.is_empty());
            assert_eq!(citations.as_ref().map(Vec::len), Some(1));
        },
        other => panic!("unexpected block {:?}", other),
    }
    assert_eq!(res.content[4], ContentBlock::text("Rust is fast."));
    assert_eq!(res.stop_reason, StopReason::EndTurn);
    assert_eq!(res.usage.output_tokens, 6);
    assert_eq!(res.usage.server_tool_use.map(|s| s.web_search_requests), Some(1));
}

#[tokio::test]
async fn test_body_parsing_unwraps_envelope_and_rejects_garbage() {
    let (services, _) = services();
    let body = br#"{"response":{"candidates":[{"content":{"parts":[{"text":"hi"}]}}]}}"#;
    let res = transform_response_body(body, &TransformOptions::default(), &services).await.unwrap();
    assert_eq!(res.content, vec![ContentBlock::text("hi")]);

    let err = transform_response_body(b"{oops", &TransformOptions::default(), &services)
        .await
        .unwrap_err();
    assert!(matches!(err, TransformError::InvalidDocument { .. }));
}
