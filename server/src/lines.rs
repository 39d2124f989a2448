//! Bounded line reader for client connections

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// One unit of client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    Line(String),
    /// The line went past the limit. The rest of it, up to the next newline,
    /// is discarded without being buffered.
    TooLong,
    InvalidEncoding,
}

/// Splits a byte stream on `\n` without ever holding more than
/// `max_line_len` bytes of a single line.
///
/// Partial lines live in the reader, so a `read_line` cancelled by a timeout
/// loses nothing.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    pending: Vec<u8>,
    max_line_len: usize,
    discarding: bool,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R, max_line_len: usize) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            max_line_len: max_line_len.max(1),
            discarding: false,
        }
    }

    /// Returns `Ok(None)` on EOF. A final line without a trailing newline is
    /// still returned.
    pub async fn read_line(&mut self) -> std::io::Result<Option<LineEvent>> {
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                if self.discarding || self.pending.is_empty() {
                    self.discarding = false;
                    return Ok(None);
                }
                let line = std::mem::take(&mut self.pending);
                return Ok(Some(decode(line)));
            }

            let newline = available.iter().position(|&b| b == b'\n');
            let chunk = &available[..newline.unwrap_or(available.len())];
            let consumed = newline.map_or(available.len(), |i| i + 1);

            if self.discarding {
                self.inner.consume(consumed);
                if newline.is_some() {
                    self.discarding = false;
                }
                continue;
            }

            if self.pending.len() + chunk.len() > self.max_line_len {
                self.pending.clear();
                self.inner.consume(consumed);
                self.discarding = newline.is_none();
                return Ok(Some(LineEvent::TooLong));
            }

            self.pending.extend_from_slice(chunk);
            self.inner.consume(consumed);
            if newline.is_some() {
                let line = std::mem::take(&mut self.pending);
                return Ok(Some(decode(line)));
            }
        }
    }
}

fn decode(mut line: Vec<u8>) -> LineEvent {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    match String::from_utf8(line) {
        Ok(line) => LineEvent::Line(line),
        Err(_) => LineEvent::InvalidEncoding,
    }
}
