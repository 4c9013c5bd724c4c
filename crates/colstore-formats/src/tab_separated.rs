//! Escaped tab-separated rows.
//!
//! Rows are `Vec<String>` cells joined by tabs, one row per line, with the
//! tab/newline/carriage-return/backslash escape set. Useful for ad-hoc
//! tooling and as the second, structurally different codec exercising the
//! format interface.

use bytes::{BufMut, BytesMut};

use crate::error::FormatError;
use crate::line::LineSplitter;
use crate::traits::{Format, RowDecoder, RowEncoder};

/// The `TabSeparated` format descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabSeparated;

impl Format for TabSeparated {
    fn name(&self) -> &'static str {
        "TabSeparated"
    }

    fn content_type(&self) -> &'static str {
        "text/tab-separated-values"
    }
}

/// Encoder for tab-separated rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabSeparatedEncoder;

impl RowEncoder<Vec<String>> for TabSeparatedEncoder {
    fn encode(&mut self, row: &Vec<String>, dst: &mut BytesMut) -> Result<(), FormatError> {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                dst.put_u8(b'\t');
            }
            escape_into(cell, dst);
        }
        dst.put_u8(b'\n');
        Ok(())
    }
}

/// Decoder for tab-separated rows.
#[derive(Debug, Default)]
pub struct TabSeparatedDecoder {
    lines: LineSplitter,
    rows_decoded: u64,
}

impl TabSeparatedDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowDecoder<Vec<String>> for TabSeparatedDecoder {
    fn feed(&mut self, chunk: &[u8]) {
        self.lines.feed(chunk);
    }

    fn try_next(&mut self) -> Result<Option<Vec<String>>, FormatError> {
        let Some(line) = self.lines.next_line() else {
            return Ok(None);
        };
        self.rows_decoded += 1;
        let row = self.rows_decoded;
        let cells = unescape_row(&line).map_err(|message| FormatError::Parse { row, message })?;
        Ok(Some(cells))
    }

    fn finish(&mut self) -> Result<(), FormatError> {
        match self.lines.pending() {
            0 => Ok(()),
            len => Err(FormatError::TrailingPartial { len }),
        }
    }
}

fn escape_into(cell: &str, dst: &mut BytesMut) {
    for byte in cell.bytes() {
        match byte {
            b'\\' => dst.put_slice(b"\\\\"),
            b'\t' => dst.put_slice(b"\\t"),
            b'\n' => dst.put_slice(b"\\n"),
            b'\r' => dst.put_slice(b"\\r"),
            other => dst.put_u8(other),
        }
    }
}

fn unescape_row(line: &[u8]) -> Result<Vec<String>, String> {
    let mut cells = Vec::new();
    let mut cell = Vec::new();
    let mut bytes = line.iter().copied();
    while let Some(byte) = bytes.next() {
        match byte {
            b'\t' => cells.push(take_cell(&mut cell)?),
            b'\\' => match bytes.next() {
                Some(b't') => cell.push(b'\t'),
                Some(b'n') => cell.push(b'\n'),
                Some(b'r') => cell.push(b'\r'),
                Some(b'\\') => cell.push(b'\\'),
                // Unknown escapes pass the escaped byte through.
                Some(other) => cell.push(other),
                None => return Err("dangling backslash at end of row".to_string()),
            },
            other => cell.push(other),
        }
    }
    cells.push(take_cell(&mut cell)?);
    Ok(cells)
}

fn take_cell(cell: &mut Vec<u8>) -> Result<String, String> {
    String::from_utf8(std::mem::take(cell)).map_err(|e| format!("invalid UTF-8 in cell: {e}"))
}
