//! Chunked transfer-encoding framing.
//!
//! Requests with streamed bodies and most server responses use chunked
//! encoding. The encoder side is two free functions; the decoder is an
//! incremental state machine that tolerates chunk frames split arbitrarily
//! across TCP segments.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::WireError;

/// Upper bound on a chunk-size line, including extensions we discard.
const MAX_SIZE_LINE: usize = 256;

/// Encode one non-empty data chunk (`<hex-size>\r\n<data>\r\n`).
///
/// Empty input encodes nothing: a zero-length chunk would terminate the body.
pub fn encode_chunk(data: &[u8], dst: &mut BytesMut) {
    if data.is_empty() {
        return;
    }
    let mut size = [0u8; 16];
    let size = write_hex(data.len(), &mut size);
    dst.reserve(size.len() + data.len() + 4);
    dst.put_slice(size);
    dst.put_slice(b"\r\n");
    dst.put_slice(data);
    dst.put_slice(b"\r\n");
}

/// Encode the terminal zero-length chunk (`0\r\n\r\n`).
pub fn encode_final_chunk(dst: &mut BytesMut) {
    dst.put_slice(b"0\r\n\r\n");
}

fn write_hex(mut value: usize, buf: &mut [u8; 16]) -> &[u8] {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = DIGITS[value & 0xf];
        value >>= 4;
        if value == 0 {
            break;
        }
    }
    &buf[pos..]
}

/// One event produced by the [`ChunkedDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkEvent {
    /// A slice of body data. May be any fragment of a wire chunk.
    Data(Bytes),
    /// The terminal chunk (and any trailers) has been consumed.
    End,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Size,
    Data { remaining: u64 },
    DataCrlf,
    Trailer,
    Done,
}

/// Incremental decoder for a chunked response body.
///
/// Data is surfaced as soon as it arrives: a partially received wire chunk
/// yields its available prefix rather than waiting for the full chunk.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: State,
}

impl ChunkedDecoder {
    /// Create a decoder positioned at the first chunk-size line.
    #[must_use]
    pub fn new() -> Self {
        Self { state: State::Size }
    }

    /// Whether the terminal chunk has been fully consumed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Decode the next event from `src`, consuming what it parses.
    ///
    /// Returns `Ok(None)` when more input is needed.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ChunkEvent>, WireError> {
        loop {
            match self.state {
                State::Size => {
                    let Some(line) = take_line(src, MAX_SIZE_LINE)? else {
                        return Ok(None);
                    };
                    let size = parse_chunk_size(&line)?;
                    self.state = if size == 0 {
                        State::Trailer
                    } else {
                        State::Data { remaining: size }
                    };
                }
                State::Data { remaining } => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let take = src.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
                    let data = src.split_to(take).freeze();
                    let left = remaining - take as u64;
                    self.state = if left == 0 {
                        State::DataCrlf
                    } else {
                        State::Data { remaining: left }
                    };
                    return Ok(Some(ChunkEvent::Data(data)));
                }
                State::DataCrlf => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    if &src[..2] != b"\r\n" {
                        return Err(WireError::InvalidChunkSize(
                            String::from_utf8_lossy(&src[..2]).into_owned(),
                        ));
                    }
                    src.advance(2);
                    self.state = State::Size;
                }
                State::Trailer => {
                    let Some(line) = take_line(src, MAX_SIZE_LINE)? else {
                        return Ok(None);
                    };
                    if line.is_empty() {
                        self.state = State::Done;
                        return Ok(Some(ChunkEvent::End));
                    }
                    // Trailer headers are permitted but carry nothing we use.
                }
                State::Done => return Ok(None),
            }
        }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Take one CRLF-terminated line, without the terminator.
fn take_line(src: &mut BytesMut, max: usize) -> Result<Option<Bytes>, WireError> {
    match src.windows(2).position(|w| w == b"\r\n") {
        Some(pos) => {
            let line = src.split_to(pos).freeze();
            src.advance(2);
            Ok(Some(line))
        }
        None if src.len() > max => Err(WireError::InvalidChunkSize(
            String::from_utf8_lossy(&src[..max.min(32)]).into_owned(),
        )),
        None => Ok(None),
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, WireError> {
    // Chunk extensions (`;name=value`) are discarded.
    let digits = match line.iter().position(|&b| b == b';') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let text = std::str::from_utf8(digits)
        .map_err(|_| WireError::InvalidChunkSize(String::from_utf8_lossy(line).into_owned()))?
        .trim();
    if text.is_empty() {
        return Err(WireError::InvalidChunkSize(String::new()));
    }
    u64::from_str_radix(text, 16)
        .map_err(|_| WireError::InvalidChunkSize(text.to_string()))
}
