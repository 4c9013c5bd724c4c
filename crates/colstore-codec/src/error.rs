//! Codec error types.

use thiserror::Error;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// IO error during read/write operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire-level error from colstore-http.
    #[error("wire error: {0}")]
    Wire(#[from] colstore_http::WireError),

    /// The server closed the connection mid-message.
    #[error("connection closed")]
    ConnectionClosed,
}
