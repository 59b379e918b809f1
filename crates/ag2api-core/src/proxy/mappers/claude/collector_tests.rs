#![allow(clippy::unwrap_used)]

use super::collector::collect_stream_to_json;
use ag2api_types::protocol::{ContentBlock, StopReason};
use ag2api_types::TransformError;
use bytes::Bytes;
use futures::stream;

fn byte_stream(
    sse_data: Vec<&'static str>,
) -> impl futures::Stream<Item = Result<Bytes, TransformError>> + Unpin {
    stream::iter(sse_data.into_iter().map(|s| Ok::<Bytes, TransformError>(Bytes::from(s))))
}

#[tokio::test]
async fn test_collect_simple_text_response() {
    let sse_data = vec![
        "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_123\",\"type\":\"message\",\"role\":\"assistant\",\"model\":\"claude-sonnet-4-5\",\"content\":[],\"stop_reason\":null,\"usage\":{\"input_tokens\":10,\"output_tokens\":0}}}\n\n",
        "event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" World\"}}\n\n",
        "event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
        "event: message_delta\ndata: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"input_tokens\":10,\"output_tokens\":5}}\n\n",
        "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
    ];

    let response = collect_stream_to_json(byte_stream(sse_data)).await.unwrap();
    assert_eq!(response.id, "msg_123");
    assert_eq!(response.model, "claude-sonnet-4-5");
    assert_eq!(response.content, vec![ContentBlock::text("Hello World")]);
    assert_eq!(response.stop_reason, StopReason::EndTurn);
    assert_eq!(response.usage.output_tokens, 5);
}

#[tokio::test]
async fn test_collect_thinking_signature_and_tool_use() {
    let sse_data = vec![
        "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_think\",\"model\":\"m\",\"usage\":{\"input_tokens\":1,\"output_tokens\":0}}}\n\n",
        "event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"thinking\",\"thinking\":\"\",\"signature\":\"\"}}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"thinking_delta\",\"thinking\":\"I am \"}}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"thinking_delta\",\"thinking\":\"thinking\"}}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"signature_delta\",\"signature\":\"sig_123456\"}}\n\n",
        "event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
        "event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":1,\"content_block\":{\"type\":\"tool_use\",\"id\":\"toolu_1\",\"name\":\"read\",\"input\":{}}}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"path\\\":\\\"a\\\"}\"}}\n\n",
        "event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":1}\n\n",
        "event: message_delta\ndata: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"tool_use\"},\"usage\":{\"input_tokens\":1,\"output_tokens\":10}}\n\n",
        "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
    ];

    let response = collect_stream_to_json(byte_stream(sse_data)).await.unwrap();
    assert_eq!(
        response.content[0],
        ContentBlock::thinking("I am thinking", Some("sig_123456".to_string()))
    );
    assert_eq!(
        response.content[1],
        ContentBlock::ToolUse {
            id: "toolu_1".to_string(),
            name: "read".to_string(),
            input: serde_json::json!({"path": "a"}),
        }
    );
    assert_eq!(response.stop_reason, StopReason::ToolUse);
}

#[tokio::test]
async fn test_collect_events_split_across_chunks() {
    let sse_data = vec![
        "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"m1\"}}\n",
        "\nevent: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\nevent: content_block_del",
        "ta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"ok\"}}\n\n",
        "event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
    ];

    let response = collect_stream_to_json(byte_stream(sse_data)).await.unwrap();
    assert_eq!(response.id, "m1");
    assert_eq!(response.content, vec![ContentBlock::text("ok")]);
}

#[tokio::test]
async fn test_collect_surfaces_error_event() {
    let sse_data = vec![
        "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Upstream error: busy\"}}\n\n",
    ];

    let err = collect_stream_to_json(byte_stream(sse_data)).await.unwrap_err();
    assert_eq!(err, TransformError::StreamAborted { message: "Upstream error: busy".to_string() });
}

#[tokio::test]
async fn test_collect_multibyte_char_split_across_chunks() {
    let sse = "event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n\
               event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"caf\u{e9} \u{1f980}\"}}\n\n\
               event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":0}\n\n";
    let bytes = sse.as_bytes();
    let e_acute = sse.find('\u{e9}').unwrap();
    let crab = sse.find('\u{1f980}').unwrap();
    let chunks = vec![
        Bytes::copy_from_slice(&bytes[..e_acute + 1]),
        Bytes::copy_from_slice(&bytes[e_acute + 1..crab + 2]),
        Bytes::copy_from_slice(&bytes[crab + 2..]),
    ];

    let response =
        collect_stream_to_json(stream::iter(chunks.into_iter().map(Ok::<Bytes, TransformError>)))
            .await
            .unwrap();
    assert_eq!(response.content, vec![ContentBlock::text("caf\u{e9} \u{1f980}")]);
}
