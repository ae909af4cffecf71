//! Server-sent-event framing for the hedge-fund run body.
//!
//! The body is newline-delimited `data: <json>` frames terminated by
//! `data: [DONE]` (or by the connection closing). Chunks from the wire do not
//! respect line boundaries, so [`LineDecoder`] buffers the partial tail.

use ahf_schemas::DetailedAnalysis;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::events::{ProgressEvent, StreamEvent};

/// Reassembles complete lines out of arbitrary byte chunks.
///
/// Bytes are buffered rather than decoded per chunk so a multi-byte UTF-8
/// character split across two chunks survives intact.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every line it completed, in order, without
    /// the trailing `\n` / `\r\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(decode_line(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// Flush an unterminated final line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buf);
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    s.strip_suffix('\r').unwrap_or(&s).to_string()
}

/// One meaningful line of the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(StreamEvent),
    /// `data: [DONE]`
    Done,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    agent: Option<String>,
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Parse one line. Returns `None` for lines that carry nothing for us:
/// blank separators, comments, `event:`/`id:` fields, malformed JSON
/// (logged) and payload types this client does not consume.
pub fn parse_frame(line: &str) -> Option<Frame> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    if payload == "[DONE]" {
        return Some(Frame::Done);
    }

    let raw: RawFrame = match serde_json::from_str(payload) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, line = %truncate(payload, 120), "skipping unparseable stream frame");
            return None;
        }
    };

    match raw.kind.as_str() {
        "progress" => {
            let Some(agent) = raw.agent else {
                warn!("progress frame without agent; skipped");
                return None;
            };
            let status = raw
                .status
                .or_else(|| nested_str(&raw.data, "status"))
                .unwrap_or_default();
            let ticker = raw.ticker.or_else(|| nested_str(&raw.data, "ticker"));
            Some(Frame::Event(StreamEvent::Progress(ProgressEvent {
                agent,
                status,
                ticker,
            })))
        }
        "complete" => {
            let data = raw.data.unwrap_or(Value::Null);
            match serde_json::from_value::<DetailedAnalysis>(data) {
                Ok(d) => Some(Frame::Event(StreamEvent::Complete(d))),
                Err(e) => {
                    warn!(error = %e, "complete frame does not match schema; skipped");
                    None
                }
            }
        }
        "error" => {
            let msg = raw
                .message
                .or_else(|| nested_str(&raw.data, "message"))
                .unwrap_or_else(|| "analysis failed".to_string());
            Some(Frame::Event(StreamEvent::Error(msg)))
        }
        other => {
            debug!(kind = other, "ignoring stream frame type");
            None
        }
    }
}

fn nested_str(data: &Option<Value>, key: &str) -> Option<String> {
    data.as_ref()?.get(key)?.as_str().map(str::to_string)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_lines_are_buffered_across_chunks() {
        let mut d = LineDecoder::new();
        assert!(d.push(b"data: {\"type\":").is_empty());
        let lines = d.push(b"\"progress\"}\n\ndata: [DO");
        assert_eq!(lines, vec!["data: {\"type\":\"progress\"}".to_string(), String::new()]);
        assert_eq!(d.push(b"NE]\r\n"), vec!["data: [DONE]".to_string()]);
        assert_eq!(d.finish(), None);
    }

    #[test]
    fn split_utf8_character_survives() {
        let text = "data: {\"type\":\"progress\",\"agent\":\"a\",\"status\":\"Analyzing \u{00e9}\"}\n";
        let bytes = text.as_bytes();
        let cut = text.find('\u{00e9}').unwrap() + 1; // inside the 2-byte sequence
        let mut d = LineDecoder::new();
        assert!(d.push(&bytes[..cut]).is_empty());
        let lines = d.push(&bytes[cut..]);
        assert_eq!(lines[0], text.trim_end());
    }

    #[test]
    fn unterminated_tail_is_flushed() {
        let mut d = LineDecoder::new();
        d.push(b"data: [DONE]");
        assert_eq!(d.finish().as_deref(), Some("data: [DONE]"));
    }

    #[test]
    fn status_may_be_nested_under_data() {
        let f = parse_frame(
            r#"data: {"type":"progress","agent":"sentiment_agent","data":{"status":"Fetching company news","ticker":"AAPL"}}"#,
        );
        assert_eq!(
            f,
            Some(Frame::Event(StreamEvent::Progress(ProgressEvent {
                agent: "sentiment_agent".into(),
                status: "Fetching company news".into(),
                ticker: Some("AAPL".into()),
            })))
        );
    }

    #[test]
    fn non_data_and_malformed_lines_are_skipped() {
        assert_eq!(parse_frame(""), None);
        assert_eq!(parse_frame(": keep-alive"), None);
        assert_eq!(parse_frame("event: progress"), None);
        assert_eq!(parse_frame("data: {not json"), None);
        assert_eq!(parse_frame(r#"data: {"type":"start"}"#), None);
        assert_eq!(parse_frame(r#"data: {"type":"progress"}"#), None);
    }

    #[test]
    fn done_and_error_frames() {
        assert_eq!(parse_frame("data:[DONE]"), Some(Frame::Done));
        assert_eq!(
            parse_frame(r#"data: {"type":"error","message":"rate limited"}"#),
            Some(Frame::Event(StreamEvent::Error("rate limited".into())))
        );
    }
}
