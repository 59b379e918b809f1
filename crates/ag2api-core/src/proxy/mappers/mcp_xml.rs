//! MCP-XML bridging: tool calls written as XML-ish tags in answer text.
//!
//! Some clients expose MCP tools to models that cannot call them natively. The
//! model then writes `<tool_name>{"arg": 1}</tool_name>` into its answer, and
//! this segmenter splits such text into plain text and tool segments. Tags may
//! be split across chunks, so partial openings are held back until the next
//! chunk decides them.

use serde_json::{json, Value};

/// One piece of segmented answer text.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Tool { name: String, input: Value },
}

/// Incremental text -> segment splitter, one instance per response.
pub trait McpXmlSegmenter: Send {
    /// Feed the next answer-text chunk.
    fn push_text(&mut self, chunk: &str) -> Vec<Segment>;

    /// Release whatever is still held back at end of response.
    fn flush(&mut self) -> Vec<Segment>;
}

/// Default segmenter recognising `<NAME>json</NAME>` for a fixed set of names.
#[derive(Debug, Clone)]
pub struct McpXmlStreamParser {
    tool_names: Vec<String>,
    buffer: String,
    open_tool: Option<String>,
}

impl McpXmlStreamParser {
    pub fn new(tool_names: &[String]) -> Self {
        Self {
            tool_names: tool_names.iter().filter(|n| !n.is_empty()).cloned().collect(),
            buffer: String::new(),
            open_tool: None,
        }
    }

    /// Earliest tag start in the buffer: either a complete opening tag
    /// (`Some(name)`) or a suffix that could still grow into one (`None`).
    fn find_tag_start(&self) -> Option<(usize, Option<String>)> {
        for (pos, ch) in self.buffer.char_indices() {
            if ch != '<' {
                continue;
            }
            let rest = &self.buffer[pos..];
            for name in &self.tool_names {
                let tag = format!("<{}>", name);
                if rest.starts_with(&tag) {
                    return Some((pos, Some(name.clone())));
                }
            }
            if self.tool_names.iter().any(|name| format!("<{}>", name).starts_with(rest)) {
                return Some((pos, None));
            }
        }
        None
    }

    fn drain_text(&mut self, end: usize, out: &mut Vec<Segment>) {
        if end == 0 {
            return;
        }
        let text: String = self.buffer.drain(..end).collect();
        out.push(Segment::Text(text));
    }
}

fn parse_tool_input(raw: &str) -> Value {
    let trimmed = raw.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => value,
        _ => json!({ "input": trimmed }),
    }
}

impl McpXmlSegmenter for McpXmlStreamParser {
    fn push_text(&mut self, chunk: &str) -> Vec<Segment> {
        self.buffer.push_str(chunk);
        let mut out = Vec::new();

        loop {
            if let Some(name) = self.open_tool.clone() {
                let closing = format!("</{}>", name);
                let Some(idx) = self.buffer.find(&closing) else {
                    break;
                };
                let body: String = self.buffer.drain(..idx).collect();
                self.buffer.drain(..closing.len());
                self.open_tool = None;
                tracing::debug!("[MCP-XML] Extracted tool call: {}", name);
                out.push(Segment::Tool { name, input: parse_tool_input(&body) });
                continue;
            }

            match self.find_tag_start() {
                Some((pos, Some(name))) => {
                    self.drain_text(pos, &mut out);
                    self.buffer.drain(..name.len() + 2);
                    self.open_tool = Some(name);
                }
                Some((pos, None)) => {
                    self.drain_text(pos, &mut out);
                    break;
                }
                None => {
                    let len = self.buffer.len();
                    self.drain_text(len, &mut out);
                    break;
                }
            }
        }

        out
    }

    fn flush(&mut self) -> Vec<Segment> {
        let mut text = String::new();
        if let Some(name) = self.open_tool.take() {
            text.push_str(&format!("<{}>", name));
        }
        text.push_str(&self.buffer);
        self.buffer.clear();
        if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::Text(text)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> McpXmlStreamParser {
        McpXmlStreamParser::new(&["read_file".to_string(), "search".to_string()])
    }

    #[test]
    fn test_plain_text_passes_through() {
        let mut p = parser();
        assert_eq!(p.push_text("hello world"), vec![Segment::Text("hello world".to_string())]);
        assert!(p.flush().is_empty());
    }

    #[test]
    fn test_complete_tool_in_one_chunk() {
        let mut p = parser();
        let out = p.push_text(r#"Let me look. <read_file>{"path": "a.rs"}</read_file> done"#);
        assert_eq!(
            out,
            vec![
                Segment::Text("Let me look. ".to_string()),
                Segment::Tool { name: "read_file".to_string(), input: json!({"path": "a.rs"}) },
                Segment::Text(" done".to_string()),
            ]
        );
    }

    #[test]
    fn test_tag_split_across_chunks() {
        let mut p = parser();
        assert_eq!(p.push_text("before <read_"), vec![Segment::Text("before ".to_string())]);
        assert!(p.push_text("file>{\"path\":").is_empty());
        let out = p.push_text("\"x\"}</read_file>");
        assert_eq!(
            out,
            vec![Segment::Tool { name: "read_file".to_string(), input: json!({"path": "x"}) }]
        );
    }

    #[test]
    fn test_unknown_tag_is_text() {
        let mut p = parser();
        assert_eq!(p.push_text("a <b>c</b>"), vec![Segment::Text("a <b>c</b>".to_string())]);
    }

    #[test]
    fn test_non_json_body_falls_back() {
        let mut p = parser();
        let out = p.push_text("<search> rust async </search>");
        assert_eq!(
            out,
            vec![Segment::Tool { name: "search".to_string(), input: json!({"input": "rust async"}) }]
        );
    }

    #[test]
    fn test_flush_releases_unclosed_tag() {
        let mut p = parser();
        assert!(p.push_text("<search>{\"q\":").is_empty());
        assert_eq!(p.flush(), vec![Segment::Text("<search>{\"q\":".to_string())]);
    }

    #[test]
    fn test_flush_releases_partial_opening() {
        let mut p = parser();
        assert_eq!(p.push_text("x <sea"), vec![Segment::Text("x ".to_string())]);
        assert_eq!(p.flush(), vec![Segment::Text("<sea".to_string())]);
    }
}
