//! Wire-level error types.

use thiserror::Error;

/// Errors that can occur while encoding or parsing HTTP/1.1 framing.
#[derive(Debug, Error)]
pub enum WireError {
    /// The status line could not be parsed.
    #[error("invalid status line: {0:?}")]
    InvalidStatusLine(String),

    /// A header line is malformed (missing `:` separator or invalid bytes).
    #[error("invalid header line: {0:?}")]
    InvalidHeader(String),

    /// The response head exceeds the maximum allowed size.
    #[error("response head too large: {size} bytes (max {max})")]
    HeadTooLarge {
        /// Bytes buffered so far.
        size: usize,
        /// Maximum allowed head size.
        max: usize,
    },

    /// A chunk-size line is not valid hexadecimal.
    #[error("invalid chunk size line: {0:?}")]
    InvalidChunkSize(String),

    /// A `Content-Length` header is not a valid integer.
    #[error("invalid content length: {0:?}")]
    InvalidContentLength(String),

    /// The peer closed the stream mid-message.
    #[error("unexpected end of stream")]
    UnexpectedEof,
}
