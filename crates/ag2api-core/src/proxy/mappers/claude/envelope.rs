// Upstream document parsing with `{"response": {...}}` envelope unwrapping

use ag2api_types::protocol::GeminiResponse;
use serde_json::Value;

/// Strip the optional `response` envelope.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("response").is_some_and(Value::is_object) => {
            map.remove("response").unwrap_or(Value::Null)
        },
        other => other,
    }
}

/// Parse one upstream document (or one SSE chunk payload).
pub fn parse_gemini_document(raw: &str) -> Result<GeminiResponse, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    serde_json::from_value(unwrap_envelope(value))
}
