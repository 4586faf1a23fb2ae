//! Incremental decoder for the chat relay's server-sent-event stream.
//!
//! Chunks arrive with arbitrary boundaries: a chunk may end in the middle of
//! a line, a JSON object, or a multi-byte UTF-8 sequence. The decoder keeps a
//! carry-over of undecoded bytes and unterminated text and only ever looks at
//! complete lines.

use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, trace};

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Delta(String),
    /// `data: [DONE]` was seen; nothing after it is decoded.
    Done,
}

#[derive(Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl ChunkPayload {
    fn into_delta(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
    }
}

/// Classify one complete line (without its `\n`).
fn decode_line(line: &str) -> Option<StreamFrame> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload == DONE_SENTINEL {
        return Some(StreamFrame::Done);
    }
    match serde_json::from_str::<ChunkPayload>(payload) {
        Ok(chunk) => chunk.into_delta().map(StreamFrame::Delta),
        Err(e) => {
            debug!("skipping malformed stream line: {e}");
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of an incomplete UTF-8 sequence at the end of the last chunk.
    pending: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    buffer: String,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one chunk and return the frames completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        if self.done {
            return Vec::new();
        }
        self.decode_utf8(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buffer[consumed..].find('\n') {
            let end = consumed + offset;
            let frame = decode_line(&self.buffer[consumed..end]);
            consumed = end + 1;
            match frame {
                Some(StreamFrame::Done) => {
                    self.done = true;
                    frames.push(StreamFrame::Done);
                    break;
                }
                Some(frame) => frames.push(frame),
                None => {}
            }
        }

        if self.done {
            self.buffer.clear();
            self.pending.clear();
        } else {
            self.buffer.drain(..consumed);
        }
        frames
    }

    /// End of input. An unterminated trailing line is discarded.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() || !self.pending.is_empty() {
            trace!(
                leftover_chars = self.buffer.len(),
                leftover_bytes = self.pending.len(),
                "discarding partial stream line"
            );
        }
        self.buffer.clear();
        self.pending.clear();
    }

    /// Streaming UTF-8 decode: split sequences wait for the next chunk,
    /// invalid ones become U+FFFD.
    fn decode_utf8(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let mut input = &self.pending[..];
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    input = &[];
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }

        let carried = input.len();
        let decoded = self.pending.len() - carried;
        self.pending.drain(..decoded);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSummary {
    pub deltas: usize,
    /// Whether the terminal sentinel was seen before the body ended.
    pub completed: bool,
}

/// Drive a byte stream through an [`SseDecoder`], handing each delta to
/// `on_delta` as soon as its line is complete.
///
/// A transport error ends decoding and is returned as-is; deltas delivered
/// before it stay delivered.
pub async fn decode_stream<S, B, E, F>(mut stream: S, mut on_delta: F) -> Result<DecodeSummary, E>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    F: FnMut(&str),
{
    let mut decoder = SseDecoder::new();
    let mut summary = DecodeSummary::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for frame in decoder.feed(chunk.as_ref()) {
            match frame {
                StreamFrame::Delta(delta) => {
                    summary.deltas += 1;
                    on_delta(&delta);
                }
                StreamFrame::Done => summary.completed = true,
            }
        }
        if decoder.is_done() {
            break;
        }
    }

    decoder.finish();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_line(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
        )
    }

    fn deltas(frames: Vec<StreamFrame>) -> Vec<String> {
        frames
            .into_iter()
            .filter_map(|f| match f {
                StreamFrame::Delta(d) => Some(d),
                StreamFrame::Done => None,
            })
            .collect()
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"choices\":[{\"delta\"").is_empty());
        let frames = decoder.feed(b":{\"content\":\"Hi\"}}]}\n");
        assert_eq!(frames, vec![StreamFrame::Delta("Hi".into())]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let line = delta_line("नमस्ते");
        let bytes = line.as_bytes();
        // Split inside the first Devanagari code point (3 bytes wide).
        let split = line.find('न').unwrap() + 1;

        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&bytes[..split]).is_empty());
        assert_eq!(deltas(decoder.feed(&bytes[split..])), vec!["नमस्ते".to_string()]);
    }

    #[test]
    fn test_crlf_comments_and_foreign_lines_are_ignored() {
        let input = format!(
            ": keep-alive\r\n\r\nevent: message\r\nid: 7\r\n{}",
            delta_line("ok").replace('\n', "\r\n")
        );
        let mut decoder = SseDecoder::new();
        assert_eq!(deltas(decoder.feed(input.as_bytes())), vec!["ok".to_string()]);
    }

    #[test]
    fn test_done_stops_decoding_in_same_flush() {
        let input = format!("{}data: [DONE]\n{}", delta_line("a"), delta_line("b"));
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(input.as_bytes());
        assert_eq!(frames, vec![StreamFrame::Delta("a".into()), StreamFrame::Done]);
        assert!(decoder.is_done());
        assert!(decoder.feed(delta_line("c").as_bytes()).is_empty());
    }

    #[test]
    fn test_malformed_json_is_skipped() {
        let input = format!("data: {{\"choices\":[{{\"delta\"\n{}", delta_line("fine"));
        let mut decoder = SseDecoder::new();
        assert_eq!(deltas(decoder.feed(input.as_bytes())), vec!["fine".to_string()]);
    }

    #[test]
    fn test_empty_and_missing_content_emit_nothing() {
        let input = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            "data: {\"choices\":[]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":null}}]}\n",
            "data: 42\n",
        );
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(input.as_bytes()).is_empty());
    }

    #[test]
    fn test_prefix_requires_space() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data:{\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n");
        assert!(frames.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_fatal() {
        let mut input = b"data: {\"choices\":[{\"delta\":{\"content\":\"a".to_vec();
        input.push(0xff);
        input.extend_from_slice(b"b\"}}]}\n");
        let mut decoder = SseDecoder::new();
        assert_eq!(deltas(decoder.feed(&input)), vec!["a\u{FFFD}b".to_string()]);
    }

    #[test]
    fn test_finish_discards_partial_line() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"lost\"}}]}");
        decoder.finish();
        assert!(decoder.feed(b"\n").is_empty());
    }
}
