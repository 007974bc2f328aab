//! Protocol definitions for relayed events
//!
//! A producer writes one JSON object per line:
//! `{"tooltip": "...", "title": "...", "info": "..."}\n`

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// One decoded notification record
///
/// Unknown fields are ignored and missing fields decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    /// Short identifier shown as the tray tooltip / application name
    pub tooltip: String,
    /// Notification title
    pub title: String,
    /// Notification body
    pub info: String,
}

impl Event {
    pub fn new(
        tooltip: impl Into<String>,
        title: impl Into<String>,
        info: impl Into<String>,
    ) -> Self {
        Self {
            tooltip: tooltip.into(),
            title: title.into(),
            info: info.into(),
        }
    }

    /// Decode a single frame. Trailing `\n` / `\r\n` is tolerated.
    pub fn from_line(line: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(trim_terminator(line))
    }

    /// Encode as a single newline-terminated frame
    pub fn to_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

fn trim_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Longest accepted line; longer ones are skipped up to the next terminator
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// How the stream ended after a frame
#[derive(Debug)]
pub enum StreamEnd {
    /// The peer closed the connection
    Closed,
    /// Reading failed
    Error(std::io::Error),
}

/// Result of reading one frame from the stream
///
/// `line` holds whatever was read before the terminator or the end of the
/// stream, so a final unterminated line is still handed to the caller
/// together with the reason the stream ended.
#[derive(Debug)]
pub struct Frame {
    pub line: Vec<u8>,
    /// The line exceeded the length limit and its content was discarded
    pub oversized: bool,
    pub end: Option<StreamEnd>,
}

impl Frame {
    /// The frame carries content worth decoding
    pub fn has_content(&self) -> bool {
        !self.oversized && !trim_terminator(&self.line).is_empty()
    }

    /// Decode the frame content, `None` for empty, oversized or malformed lines
    pub fn decode(&self) -> Option<Event> {
        if self.oversized {
            tracing::debug!("Skipping oversized line");
            return None;
        }
        if !self.has_content() {
            return None;
        }
        match Event::from_line(&self.line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!(
                    "Skipping malformed line ({}): {}",
                    e,
                    String::from_utf8_lossy(&self.line).trim_end()
                );
                None
            }
        }
    }
}

/// Frames a byte stream on `\n`
pub struct LineDecoder<R> {
    reader: BufReader<R>,
    max_line: usize,
}

impl<R: AsyncRead + Unpin> LineDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_line(reader, MAX_LINE_BYTES)
    }

    pub fn with_max_line(reader: R, max_line: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_line,
        }
    }

    /// Read up to and including the next terminator
    ///
    /// A line longer than the limit is consumed without being buffered and
    /// comes back as an `oversized` frame, so decoding resumes at the next
    /// line.
    pub async fn next_frame(&mut self) -> Frame {
        let mut line = Vec::new();
        let mut oversized = false;
        loop {
            let (used, terminated) = match self.reader.fill_buf().await {
                Ok([]) => {
                    return Frame {
                        line,
                        oversized,
                        end: Some(StreamEnd::Closed),
                    }
                }
                Ok(available) => {
                    let (chunk, terminated) = match available.iter().position(|b| *b == b'\n') {
                        Some(i) => (&available[..=i], true),
                        None => (available, false),
                    };
                    if !oversized {
                        if line.len() + chunk.len() > self.max_line {
                            oversized = true;
                            line = Vec::new();
                        } else {
                            line.extend_from_slice(chunk);
                        }
                    }
                    (chunk.len(), terminated)
                }
                Err(e) => {
                    return Frame {
                        line,
                        oversized,
                        end: Some(StreamEnd::Error(e)),
                    }
                }
            };
            self.reader.consume(used);
            if terminated {
                return Frame {
                    line,
                    oversized,
                    end: None,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_event() {
        let json = r#"{"tooltip":"app","title":"Started","info":"ready"}"#;
        let event = Event::from_line(json.as_bytes()).unwrap();
        assert_eq!(event, Event::new("app", "Started", "ready"));
    }

    #[test]
    fn test_missing_and_unknown_fields() {
        let json = br#"{"title":"only title","level":3}"#;
        let event = Event::from_line(json).unwrap();
        assert_eq!(event.tooltip, "");
        assert_eq!(event.title, "only title");
        assert_eq!(event.info, "");
    }

    #[test]
    fn test_crlf_terminator() {
        let event = Event::from_line(b"{\"tooltip\":\"a\",\"title\":\"b\",\"info\":\"c\"}\r\n").unwrap();
        assert_eq!(event, Event::new("a", "b", "c"));
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let event = Event::new("t\u{00e9}p", "line \"quoted\"", "multi\nline");
        let line = event.to_line().unwrap();
        assert_eq!(line.last(), Some(&b'\n'));
        // encoded newlines stay escaped, so one event is one frame
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
        assert_eq!(Event::from_line(&line).unwrap(), event);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(Event::from_line(b"not-json").is_err());
        assert!(Event::from_line(b"[1,2,3]").is_err());
    }

    #[tokio::test]
    async fn test_decoder_frames_and_eof() {
        let input: &[u8] = b"not-json\n{\"tooltip\":\"a\",\"title\":\"b\",\"info\":\"c\"}\n{\"title\":\"tail\"}";
        let mut decoder = LineDecoder::new(input);

        let first = decoder.next_frame().await;
        assert!(first.end.is_none());
        assert!(first.has_content());
        assert!(first.decode().is_none());

        let second = decoder.next_frame().await;
        assert!(second.end.is_none());
        assert_eq!(second.decode(), Some(Event::new("a", "b", "c")));

        // unterminated final line arrives together with the end of stream
        let third = decoder.next_frame().await;
        assert_eq!(third.decode().unwrap().title, "tail");
        assert!(matches!(third.end, Some(StreamEnd::Closed)));

        let last = decoder.next_frame().await;
        assert!(!last.has_content());
        assert!(matches!(last.end, Some(StreamEnd::Closed)));
    }

    #[tokio::test]
    async fn test_blank_lines_have_no_content() {
        let input: &[u8] = b"\n\r\n";
        let mut decoder = LineDecoder::new(input);
        let frame = decoder.next_frame().await;
        assert!(!frame.has_content());
        assert!(frame.decode().is_none());
        assert!(!decoder.next_frame().await.has_content());
    }

    #[tokio::test]
    async fn test_oversized_line_is_skipped_and_resynced() {
        let mut input = vec![b'x'; 200];
        input.extend_from_slice(b"\n{\"title\":\"after\"}\n");
        let mut decoder = LineDecoder::with_max_line(input.as_slice(), 64);

        let skipped = decoder.next_frame().await;
        assert!(skipped.oversized);
        assert!(skipped.line.is_empty());
        assert!(skipped.end.is_none());
        assert!(skipped.decode().is_none());

        let next = decoder.next_frame().await;
        assert!(!next.oversized);
        assert_eq!(next.decode().unwrap().title, "after");
    }

    #[tokio::test]
    async fn test_read_failure_is_not_end_of_stream() {
        let reader = partial_then_failing_reader();
        let mut decoder = LineDecoder::new(reader);

        let frame = decoder.next_frame().await;
        assert_eq!(frame.line, b"{\"title\":\"partial\"}");
        match frame.end {
            Some(StreamEnd::Error(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected read error, got {:?}", other),
        }
    }

    /// Reader that yields one unterminated line, then an `UnexpectedEof` error
    fn partial_then_failing_reader() -> impl AsyncRead + Unpin {
        tokio::io::AsyncReadExt::chain(
            &b"{\"title\":\"partial\"}"[..],
            FailingReader,
        )
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::from(
                std::io::ErrorKind::UnexpectedEof,
            )))
        }
    }
}
