//! One JSON object per line.
//!
//! The reference streaming format: self-delimiting, order-preserving, and
//! readable with nothing but a line splitter and serde_json.

use std::marker::PhantomData;

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::FormatError;
use crate::line::LineSplitter;
use crate::traits::{Format, RowDecoder, RowEncoder};

/// The `JSONEachRow` format descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEachRow;

impl Format for JsonEachRow {
    fn name(&self) -> &'static str {
        "JSONEachRow"
    }

    fn content_type(&self) -> &'static str {
        "application/x-ndjson"
    }
}

/// Encoder writing one JSON object plus `\n` per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEachRowEncoder;

impl<T: Serialize> RowEncoder<T> for JsonEachRowEncoder {
    fn encode(&mut self, row: &T, dst: &mut BytesMut) -> Result<(), FormatError> {
        serde_json::to_writer((&mut *dst).writer(), row)
            .map_err(|e| FormatError::Encode(e.to_string()))?;
        dst.put_u8(b'\n');
        Ok(())
    }
}

/// Decoder parsing one JSON object per line.
///
/// Blank lines (including the trailing newline most servers emit) are
/// skipped.
#[derive(Debug)]
pub struct JsonEachRowDecoder<T> {
    lines: LineSplitter,
    rows_decoded: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonEachRowDecoder<T> {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: LineSplitter::new(),
            rows_decoded: 0,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonEachRowDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned + Send> RowDecoder<T> for JsonEachRowDecoder<T> {
    fn feed(&mut self, chunk: &[u8]) {
        self.lines.feed(chunk);
    }

    fn try_next(&mut self) -> Result<Option<T>, FormatError> {
        while let Some(line) = self.lines.next_line() {
            if line.is_empty() {
                continue;
            }
            self.rows_decoded += 1;
            let row = serde_json::from_slice(&line).map_err(|e| FormatError::Parse {
                row: self.rows_decoded,
                message: e.to_string(),
            })?;
            return Ok(Some(row));
        }
        Ok(None)
    }

    fn finish(&mut self) -> Result<(), FormatError> {
        match self.lines.pending() {
            0 => Ok(()),
            len => Err(FormatError::TrailingPartial { len }),
        }
    }
}
