//! Line assembly from raw byte chunks
//!
//! Bytes are buffered across reads until a terminator (CR or LF) shows up.
//! Decoding is lossy: malformed UTF-8 becomes U+FFFD and never fails.

use bytes::{Buf, BytesMut};
use std::fmt;

/// Default cap on a pending line without terminator
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// One decoded line of telemetry, terminators stripped, never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine(String);

impl LogLine {
    /// Build a line from text; empty text is noise and yields `None`
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    /// Line text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the text
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_terminator(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}

/// Accumulates chunks and splits them into [`LogLine`]s
#[derive(Debug)]
pub struct LineAssembler {
    buffer: BytesMut,
    max_line_bytes: usize,
}

impl LineAssembler {
    /// Create a new assembler with the default line cap
    pub fn new() -> Self {
        Self::with_max_line_bytes(DEFAULT_MAX_LINE_BYTES)
    }

    /// Create with a custom cap on unterminated lines
    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
            max_line_bytes: max_line_bytes.max(1),
        }
    }

    /// Append a chunk. Empty chunks (read timeouts) change nothing.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pop the next complete line, skipping empty ones
    pub fn next_line(&mut self) -> Option<LogLine> {
        loop {
            let line = match self.buffer.iter().position(|&b| is_terminator(b)) {
                Some(pos) => {
                    let raw = self.buffer.split_to(pos);
                    self.buffer.advance(1);
                    raw
                }
                None if self.buffer.len() > self.max_line_bytes => {
                    tracing::warn!(
                        bytes = self.buffer.len(),
                        limit = self.max_line_bytes,
                        "no line terminator within limit, flushing partial line"
                    );
                    self.buffer.split()
                }
                None => return None,
            };

            if let Some(line) = LogLine::new(String::from_utf8_lossy(&line)) {
                return Some(line);
            }
        }
    }

    /// Feed a chunk and drain every line it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<LogLine> {
        self.push(chunk);
        std::iter::from_fn(|| self.next_line()).collect()
    }

    /// Number of buffered bytes not yet terminated
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial line, returning how many bytes were discarded
    pub fn discard_pending(&mut self) -> usize {
        let n = self.buffer.len();
        self.buffer.clear();
        n
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: Vec<LogLine>) -> Vec<String> {
        lines.into_iter().map(LogLine::into_string).collect()
    }

    #[test]
    fn test_crlf_line() {
        let mut assembler = LineAssembler::new();
        assert_eq!(texts(assembler.feed(b"Hello\r\n")), vec!["Hello"]);
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut assembler = LineAssembler::new();
        assert!(assembler.feed(b"RSSI=-4").is_empty());
        assert_eq!(assembler.pending(), 7);
        assert_eq!(texts(assembler.feed(b"2 SNR=9\nnext")), vec!["RSSI=-42 SNR=9"]);
        assert_eq!(assembler.pending(), 4);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut assembler = LineAssembler::new();
        let lines = texts(assembler.feed(b"a\nb\r\nc\rd\n"));
        assert_eq!(lines, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_empty_lines_dropped() {
        let mut assembler = LineAssembler::new();
        assert!(assembler.feed(b"\r\n\n\r\r\n").is_empty());
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_empty_chunks_do_not_advance() {
        let mut assembler = LineAssembler::new();
        assembler.push(b"Pi");
        for _ in 0..3 {
            assert!(assembler.feed(b"").is_empty());
        }
        assert_eq!(texts(assembler.feed(b"ng\n")), vec!["Ping"]);
    }

    #[test]
    fn test_invalid_utf8_replaced() {
        let mut assembler = LineAssembler::new();
        let lines = texts(assembler.feed(b"temp=\xff\xfe21C\n"));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("temp="));
        assert!(lines[0].contains('\u{FFFD}'));
        assert!(lines[0].ends_with("21C"));
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let mut assembler = LineAssembler::new();
        let snowman = "☃".as_bytes();
        assembler.push(&snowman[..1]);
        let lines = texts(assembler.feed(&[&snowman[1..], b"\n"].concat()));
        assert_eq!(lines, vec!["☃"]);
    }

    #[test]
    fn test_no_terminators_in_output() {
        let mut assembler = LineAssembler::new();
        let input: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
        for line in assembler.feed(&input) {
            assert!(!line.as_str().is_empty());
            assert!(!line.as_str().contains(['\r', '\n']));
        }
    }

    #[test]
    fn test_overflow_flushes_partial_line() {
        let mut assembler = LineAssembler::with_max_line_bytes(8);
        assert!(assembler.feed(b"12345678").is_empty());
        assert_eq!(texts(assembler.feed(b"9")), vec!["123456789"]);
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_discard_pending() {
        let mut assembler = LineAssembler::new();
        assembler.push(b"partial");
        assert_eq!(assembler.discard_pending(), 7);
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_log_line_rejects_empty() {
        assert!(LogLine::new("").is_none());
        assert_eq!(LogLine::new(" ").map(LogLine::into_string), Some(" ".to_string()));
    }
}
