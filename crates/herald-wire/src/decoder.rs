//! Incremental decoder for the `data: <JSON>` line protocol
//!
//! Chunks arrive in arbitrary sizes. The decoder keeps the unterminated tail
//! of the body as raw bytes, so neither a record nor a multi-byte character
//! split across chunks is ever parsed in pieces.

use crate::client::ByteStream;
use crate::event::StreamEvent;
use async_stream::stream;
use futures::StreamExt;
use std::pin::Pin;
use tokio_stream::Stream;

/// Prefix marking a record line
pub const DATA_PREFIX: &str = "data: ";

/// A stream of decoded events
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Line-buffering decoder state for one response body
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl StreamDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal event has been produced (or the input was closed)
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes held back waiting for a line terminator
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one chunk and return every event completed by it, in order.
    ///
    /// Once a terminal event has been returned, further input is ignored.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished || chunk.is_empty() {
            return events;
        }

        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let event = {
                let line = String::from_utf8_lossy(&self.buffer[start..end]);
                parse_line(&line)
            };
            start = end + 1;

            if let Some(event) = event {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    self.finished = true;
                    break;
                }
            }
        }

        if self.finished {
            self.buffer.clear();
        } else {
            self.buffer.drain(..start);
        }
        events
    }

    /// Close the input. An unterminated trailing line is dropped.
    pub fn finish(&mut self) {
        if !self.finished && !self.buffer.is_empty() {
            tracing::debug!(
                bytes = self.buffer.len(),
                "stream ended inside a line, dropping partial record"
            );
        }
        self.buffer.clear();
        self.finished = true;
    }
}

/// Parse one complete line. Anything that is not a usable record is logged
/// and skipped.
fn parse_line(line: &str) -> Option<StreamEvent> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        if !line.trim().is_empty() {
            tracing::trace!(line, "ignoring non-data line");
        }
        return None;
    };

    match StreamEvent::from_record(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, payload, "discarding stream record");
            None
        }
    }
}

/// Decode a response body into a lazy event stream.
///
/// The stream ends right after `Done` or `Error`. If the body ends (or fails)
/// first, it simply stops yielding; deciding what that means is up to the
/// consumer.
pub fn decode(mut chunks: ByteStream) -> EventStream {
    Box::pin(stream! {
        let mut decoder = StreamDecoder::new();

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in decoder.push(&bytes) {
                        yield event;
                    }
                    if decoder.is_finished() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "response body failed mid-stream");
                    break;
                }
            }
        }

        decoder.finish();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const BODY: &str = concat!(
        "data: {\"token\":\"Bonjour \"}\n",
        "\n",
        "data: {\"token\":\"mes amis, l'Empire é\"}\n",
        "data: {\"token\":\"ternel\"}\n",
        "data: {\"done\":true}\n",
    );

    fn decode_chunks(chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut decoder = StreamDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.push(chunk));
        }
        decoder.finish();
        events
    }

    fn expected() -> Vec<StreamEvent> {
        vec![
            StreamEvent::token("Bonjour "),
            StreamEvent::token("mes amis, l'Empire é"),
            StreamEvent::token("ternel"),
            StreamEvent::Done,
        ]
    }

    #[test]
    fn test_whole_body_in_one_chunk() {
        assert_eq!(decode_chunks(&[BODY.as_bytes()]), expected());
    }

    #[test]
    fn test_every_two_way_split_is_equivalent() {
        let bytes = BODY.as_bytes();
        for i in 0..=bytes.len() {
            let (a, b) = bytes.split_at(i);
            assert_eq!(decode_chunks(&[a, b]), expected(), "split at {}", i);
        }
    }

    #[test]
    fn test_byte_at_a_time_is_equivalent() {
        let chunks: Vec<&[u8]> = BODY.as_bytes().chunks(1).collect();
        assert_eq!(decode_chunks(&chunks), expected());
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let line = "data: {\"token\":\"é\"}\n".as_bytes();
        let pos = line.iter().position(|&b| b == 0xC3).unwrap();
        let events = decode_chunks(&[&line[..pos + 1], &line[pos + 1..]]);
        assert_eq!(events, vec![StreamEvent::token("é")]);
    }

    #[test]
    fn test_empty_chunks_ignored() {
        let events = decode_chunks(&[b"", b"data: {\"token\":\"a\"}", b"", b"\n", b""]);
        assert_eq!(events, vec![StreamEvent::token("a")]);
    }

    #[test]
    fn test_malformed_lines_do_not_break_parsing() {
        let body = concat!(
            "data: {\"token\":\"one\"}\n",
            "data: {not json}\n",
            "event: ping\n",
            ": keep-alive\n",
            "data:{\"token\":\"no space\"}\n",
            "data: {\"token\":\"two\"}\n",
            "data: {\"unknown\":true}\n",
            "data: {\"done\":true}\n",
        );
        assert_eq!(
            decode_chunks(&[body.as_bytes()]),
            vec![
                StreamEvent::token("one"),
                StreamEvent::token("two"),
                StreamEvent::Done
            ]
        );
    }

    #[test]
    fn test_crlf_terminators() {
        let body = "data: {\"token\":\"a\"}\r\n\r\ndata: {\"done\":true}\r\n";
        assert_eq!(
            decode_chunks(&[body.as_bytes()]),
            vec![StreamEvent::token("a"), StreamEvent::Done]
        );
    }

    #[test]
    fn test_nothing_after_done() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.push(b"data: {\"done\":true}\ndata: {\"token\":\"late\"}\n");
        assert_eq!(events, vec![StreamEvent::Done]);
        assert!(decoder.is_finished());
        assert!(decoder.push(b"data: {\"token\":\"later\"}\n").is_empty());
    }

    #[test]
    fn test_nothing_after_error() {
        let events = decode_chunks(&[
            b"data: {\"token\":\"a\"}\ndata: {\"error\":true,\"message\":\"boom\"}\n",
            b"data: {\"token\":\"b\"}\n",
        ]);
        assert_eq!(
            events,
            vec![StreamEvent::token("a"), StreamEvent::error("boom")]
        );
    }

    #[test]
    fn test_partial_line_held_until_terminated() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.push(b"data: {\"tok").is_empty());
        assert_eq!(decoder.pending_len(), 11);
        assert_eq!(
            decoder.push(b"en\":\"x\"}\n"),
            vec![StreamEvent::token("x")]
        );
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_unterminated_tail_dropped_on_finish() {
        let events = decode_chunks(&[b"data: {\"token\":\"a\"}\ndata: {\"token\":\"b\"}"]);
        assert_eq!(events, vec![StreamEvent::token("a")]);
    }

    fn byte_stream(chunks: Vec<crate::Result<Vec<u8>>>) -> ByteStream {
        Box::pin(futures::stream::iter(chunks))
    }

    #[tokio::test]
    async fn test_decode_stream_stops_at_done() {
        let chunks = vec![
            Ok(b"data: {\"token\":\"he\"}\nda".to_vec()),
            Ok(b"ta: {\"token\":\"llo\"}\n".to_vec()),
            Ok(b"data: {\"done\":true}\ndata: {\"token\":\"x\"}\n".to_vec()),
        ];
        let events: Vec<_> = decode(byte_stream(chunks)).collect().await;
        assert_eq!(
            events,
            vec![
                StreamEvent::token("he"),
                StreamEvent::token("llo"),
                StreamEvent::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_decode_stream_ends_quietly_without_terminal() {
        let chunks = vec![Ok(b"data: {\"token\":\"half\"}\ndata: {\"tok".to_vec())];
        let events: Vec<_> = decode(byte_stream(chunks)).collect().await;
        assert_eq!(events, vec![StreamEvent::token("half")]);
    }

    #[tokio::test]
    async fn test_decode_stream_stops_on_body_error() {
        let chunks = vec![
            Ok(b"data: {\"token\":\"a\"}\n".to_vec()),
            Err(Error::Aborted),
            Ok(b"data: {\"token\":\"b\"}\n".to_vec()),
        ];
        let events: Vec<_> = decode(byte_stream(chunks)).collect().await;
        assert_eq!(events, vec![StreamEvent::token("a")]);
    }
}
