//! Stream framing for the newline-delimited device link.
//!
//! A serial read returns whatever bytes happen to be in the driver buffer:
//! part of a line, several lines, or a line split across two reads. The
//! [`LineParser`] accumulates bytes and hands out complete lines only.
//!
//! # Framing Rules
//!
//! - A line ends at `\n`; a preceding `\r` is stripped.
//! - Surrounding whitespace is trimmed and blank lines are dropped.
//! - Bytes that are not valid UTF-8 are replaced, never rejected, so one
//!   corrupted byte cannot wedge the stream.
//! - No length limit is enforced; an unterminated line stays buffered until
//!   its newline arrives or the parser is cleared.

use bytes::BytesMut;
use std::collections::VecDeque;

/// Initial buffer capacity for incoming serial data.
const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Stateful line splitter for the device link.
///
/// # Example
///
/// ```
/// use keytally_protocol::LineParser;
///
/// let mut parser = LineParser::new();
///
/// parser.feed(b"BTN:");
/// assert!(parser.next_line().is_none());
///
/// parser.feed(b"3\r\nBTN:4\n");
/// assert_eq!(parser.next_line().as_deref(), Some("BTN:3"));
/// assert_eq!(parser.next_line().as_deref(), Some("BTN:4"));
/// assert!(parser.next_line().is_none());
/// ```
#[derive(Debug)]
pub struct LineParser {
    /// Bytes received after the last newline.
    buffer: BytesMut,

    /// Complete lines ready for extraction.
    lines: VecDeque<String>,
}

impl LineParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            lines: VecDeque::new(),
        }
    }

    /// Feed bytes read from the link.
    ///
    /// Every complete line contained in the accumulated bytes is queued;
    /// the trailing partial line, if any, stays buffered.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);

        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw = self.buffer.split_to(newline);
            let _ = self.buffer.split_to(1);

            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if !line.is_empty() {
                self.lines.push_back(line.to_string());
            }
        }
    }

    /// Next complete line, if one is available.
    pub fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    /// Number of complete lines waiting for extraction.
    pub fn lines_available(&self) -> usize {
        self.lines.len()
    }

    /// Number of bytes buffered for the unterminated line.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Drop queued lines and any partial line.
    ///
    /// Called when the connection is replaced: a fragment from the old link
    /// must not be glued to the first bytes of the new one.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.lines.clear();
    }

    /// Iterator over the lines queued so far.
    ///
    /// Does not consume buffered bytes; call [`feed()`](LineParser::feed)
    /// first.
    pub fn drain_lines(&mut self) -> DrainLines<'_> {
        DrainLines { parser: self }
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`LineParser::drain_lines`].
pub struct DrainLines<'a> {
    parser: &'a mut LineParser,
}

impl Iterator for DrainLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_line()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.parser.lines_available();
        (len, Some(len))
    }
}
