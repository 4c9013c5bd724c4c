//! Chunk-tolerant line scanning.

use bytes::{Buf, Bytes, BytesMut};

/// Splits an arbitrarily fragmented byte stream into newline-delimited
/// records.
///
/// Partial lines are buffered across [`feed`](Self::feed) calls, so a record
/// split across chunk boundaries is reassembled before it is yielded. The
/// newline-delimited formats build their fragmentation tolerance on this one
/// type.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: BytesMut,
}

impl LineSplitter {
    /// Create an empty splitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete line, without its terminator.
    ///
    /// A trailing `\r` (CRLF input) is stripped as well.
    pub fn next_line(&mut self) -> Option<Bytes> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line = self.buf.split_to(pos).freeze();
        self.buf.advance(1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Some(line)
    }

    /// Bytes buffered that do not yet form a complete line.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
