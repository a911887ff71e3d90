//! SSE framing and payload decoding.
//!
//! The upstream response is newline-delimited event lines. Only
//! `data: `-prefixed lines carry payload; the literal `[DONE]` payload
//! terminates the stream and is never JSON-parsed. Everything else is a
//! JSON chunk whose `choices[0].delta` may carry `reasoning_content`,
//! `content`, neither, or both — the two checks are independent.

use serde::Deserialize;
use sibyl_core::error::UpstreamError;
use sibyl_core::stream::StreamDelta;

/// What one `data:` payload decodes to.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SsePayload {
    /// The `[DONE]` end marker.
    Done,
    /// Zero, one, or two deltas (reasoning first when both are present).
    Deltas(Vec<StreamDelta>),
}

/// Decode one `data:` payload.
///
/// Malformed JSON is fatal: partial decoding could desynchronize the
/// accumulated text, so the error propagates instead of being skipped.
pub(crate) fn decode_data(data: &str) -> Result<SsePayload, UpstreamError> {
    if data == "[DONE]" {
        return Ok(SsePayload::Done);
    }

    let chunk: StreamResponse =
        serde_json::from_str(data).map_err(|e| UpstreamError::Protocol(e.to_string()))?;

    let mut deltas = Vec::new();
    if let Some(choice) = chunk.choices.first() {
        if let Some(reasoning) = &choice.delta.reasoning_content {
            deltas.push(StreamDelta::reasoning(reasoning));
        }
        if let Some(content) = &choice.delta.content {
            deltas.push(StreamDelta::answer(content));
        }
    }

    Ok(SsePayload::Deltas(deltas))
}

/// Splits an incoming byte stream into lines, tolerating chunk
/// boundaries that fall mid-line (or mid-codepoint) and CRLF endings.
///
/// Bytes are held raw and only decoded once a full line is available:
/// a multi-byte character split across two network chunks must not be
/// decoded piecewise.
pub(crate) struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pop the next complete line, without its terminator.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Drain whatever is left once the byte stream has ended — a final
    /// line may arrive without its terminator.
    pub(crate) fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        if self.buffer.last() == Some(&b'\r') {
            self.buffer.pop();
        }
        let rest = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        Some(rest)
    }
}

// --- Wire types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: WireDelta,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sibyl_core::stream::DeltaKind;

    #[test]
    fn done_marker_is_never_json_parsed() {
        assert_eq!(decode_data("[DONE]").unwrap(), SsePayload::Done);
    }

    #[test]
    fn reasoning_delta_decodes() {
        let payload =
            decode_data(r#"{"choices":[{"delta":{"reasoning_content":"hmm"}}]}"#).unwrap();
        assert_eq!(
            payload,
            SsePayload::Deltas(vec![StreamDelta::reasoning("hmm")])
        );
    }

    #[test]
    fn answer_delta_decodes() {
        let payload = decode_data(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(payload, SsePayload::Deltas(vec![StreamDelta::answer("Hi")]));
    }

    #[test]
    fn dual_field_line_yields_both_deltas_reasoning_first() {
        let payload = decode_data(
            r#"{"choices":[{"delta":{"reasoning_content":"think","content":"say"}}]}"#,
        )
        .unwrap();
        let SsePayload::Deltas(deltas) = payload else {
            panic!("expected deltas");
        };
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].kind, DeltaKind::Reasoning);
        assert_eq!(deltas[1].kind, DeltaKind::Answer);
    }

    #[test]
    fn null_fields_yield_nothing() {
        let payload = decode_data(
            r#"{"choices":[{"delta":{"reasoning_content":null,"content":null}}]}"#,
        )
        .unwrap();
        assert_eq!(payload, SsePayload::Deltas(vec![]));
    }

    #[test]
    fn missing_or_empty_choices_are_skipped() {
        assert_eq!(decode_data(r#"{}"#).unwrap(), SsePayload::Deltas(vec![]));
        assert_eq!(
            decode_data(r#"{"choices":[]}"#).unwrap(),
            SsePayload::Deltas(vec![])
        );
    }

    #[test]
    fn empty_string_content_still_emits() {
        // Non-null is the test, not non-empty.
        let payload = decode_data(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert_eq!(payload, SsePayload::Deltas(vec![StreamDelta::answer("")]));
    }

    #[test]
    fn malformed_json_is_fatal() {
        let err = decode_data("{not json").unwrap_err();
        assert!(matches!(err, UpstreamError::Protocol(_)));
    }

    #[test]
    fn finish_reason_only_chunk_yields_nothing() {
        let payload =
            decode_data(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(payload, SsePayload::Deltas(vec![]));
    }

    #[test]
    fn line_buffer_handles_split_chunks() {
        let mut buf = LineBuffer::new();
        buf.extend(b"data: {\"a\"");
        assert_eq!(buf.next_line(), None);
        buf.extend(b":1}\ndata: ");
        assert_eq!(buf.next_line(), Some("data: {\"a\":1}".to_string()));
        assert_eq!(buf.next_line(), None);
        buf.extend(b"[DONE]\n");
        assert_eq!(buf.next_line(), Some("data: [DONE]".to_string()));
    }

    #[test]
    fn line_buffer_reassembles_codepoint_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n";
        let bytes = line.as_bytes();
        // Cut between the bytes of "你" (e4 bd | a0).
        let split = line.find('你').unwrap() + 2;

        let mut buf = LineBuffer::new();
        buf.extend(&bytes[..split]);
        assert_eq!(buf.next_line(), None);
        buf.extend(&bytes[split..]);

        let line = buf.next_line().unwrap();
        let data = line.strip_prefix("data: ").unwrap();
        assert_eq!(
            decode_data(data).unwrap(),
            SsePayload::Deltas(vec![StreamDelta::answer("你好")])
        );
    }

    #[test]
    fn line_buffer_flushes_unterminated_tail() {
        let mut buf = LineBuffer::new();
        buf.extend(b"data: x\ndata: [DONE]");
        assert_eq!(buf.next_line(), Some("data: x".to_string()));
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.take_remainder(), Some("data: [DONE]".to_string()));
        assert_eq!(buf.take_remainder(), None);
    }

    #[test]
    fn line_buffer_strips_crlf() {
        let mut buf = LineBuffer::new();
        buf.extend(b"data: x\r\n\r\n");
        assert_eq!(buf.next_line(), Some("data: x".to_string()));
        assert_eq!(buf.next_line(), Some(String::new()));
        assert_eq!(buf.next_line(), None);
    }
}
