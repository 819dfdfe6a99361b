//! Server-Sent Events (SSE) parsing for the streaming completion endpoint.
//!
//! The Groq API streams completions as SSE: each event carries a JSON chunk
//! in its `data:` field, and the sequence ends with a literal `data: [DONE]`
//! sentinel. The parser here is line-driven so it can sit on top of any
//! buffered byte source.

/// Sentinel payload the API sends after the final chunk.
pub(crate) const DONE_MARKER: &str = "[DONE]";

/// Accumulates SSE lines into complete event payloads.
#[derive(Debug, Default)]
pub(crate) struct SseParser {
    data: String,
}

impl SseParser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed one line from the wire.
    ///
    /// Returns the accumulated `data:` payload when the blank separator line
    /// that terminates an event is reached. `event:`, `id:`, `retry:` fields
    /// and comment lines are ignored.
    pub(crate) fn push_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.data));
        }
        if let Some(data) = line.strip_prefix("data: ") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(data);
        }
        None
    }

    /// Flush a trailing payload that was not followed by a blank line.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.data.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data))
        }
    }
}

/// Extract the text delta from one streamed chunk payload.
///
/// Chunks that carry no text (role announcements, finish markers) yield
/// `None`.
pub(crate) fn delta_content(payload: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    value["choices"][0]["delta"]["content"]
        .as_str()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::{DONE_MARKER, SseParser, delta_content};

    #[test]
    fn parser_emits_payload_on_blank_line() {
        let mut parser = SseParser::new();
        assert_eq!(parser.push_line("data: {\"a\":1}"), None);
        assert_eq!(parser.push_line(""), Some("{\"a\":1}".to_string()));
        // Separator with nothing buffered is a no-op.
        assert_eq!(parser.push_line(""), None);
    }

    #[test]
    fn parser_joins_multi_line_data() {
        let mut parser = SseParser::new();
        parser.push_line("data: first");
        parser.push_line("data: second");
        assert_eq!(parser.push_line(""), Some("first\nsecond".to_string()));
    }

    #[test]
    fn parser_ignores_non_data_fields() {
        let mut parser = SseParser::new();
        assert_eq!(parser.push_line(": keep-alive comment"), None);
        assert_eq!(parser.push_line("event: message"), None);
        assert_eq!(parser.push_line("retry: 500"), None);
        parser.push_line("data: payload");
        assert_eq!(parser.push_line(""), Some("payload".to_string()));
    }

    #[test]
    fn parser_flushes_trailing_payload() {
        let mut parser = SseParser::new();
        parser.push_line(&format!("data: {DONE_MARKER}"));
        assert_eq!(parser.finish(), Some(DONE_MARKER.to_string()));
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn delta_content_extracts_text() {
        let payload = r#"{"choices":[{"delta":{"content":"Hel"},"index":0}]}"#;
        assert_eq!(delta_content(payload), Some("Hel".to_string()));
    }

    #[test]
    fn delta_content_skips_non_text_chunks() {
        // First chunk of a stream only announces the role.
        let payload = r#"{"choices":[{"delta":{"role":"assistant"},"index":0}]}"#;
        assert_eq!(delta_content(payload), None);
        assert_eq!(delta_content("not json"), None);
        let finish = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(delta_content(finish), None);
    }
}
