//! Client error types.

use std::time::Duration;

use thiserror::Error;

use colstore_codec::CodecError;
use colstore_driver_pool::PoolError;
use colstore_formats::FormatError;
use colstore_transport::TransportError;

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by client operations.
///
/// The variant fixes how the underlying connection was classified on
/// release: transport, codec, timeout, and abort failures poison the
/// connection; server and format errors leave it reusable.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket-level fault (connect refused, reset, DNS failure).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response could not be framed (malformed head, truncated body).
    #[error("protocol error: {0}")]
    Codec(#[from] CodecError),

    /// The server answered with a non-2xx status.
    #[error("server error (status {status}): {message}")]
    Server {
        /// Server-reported error code, when the body carried one.
        code: Option<i64>,
        /// HTTP status.
        status: u16,
        /// Server error text, verbatim.
        message: String,
    },

    /// The operation exceeded its configured deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation was aborted by its caller (or by client shutdown).
    #[error("operation aborted")]
    Aborted,

    /// Pool-level failure (most commonly: the client was closed).
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// Row data could not be encoded or decoded.
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// The client configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether this is a timeout. Callers commonly pattern-match on this.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Whether the server rejected the request at the SQL level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    /// Whether the failure poisoned the connection that carried it.
    ///
    /// Retry policy is the caller's concern; this tells it whether the
    /// failure was at the transport level (worth retrying on a fresh
    /// connection) or a data/server problem (retrying will not help).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Codec(_) | Self::Timeout(_) | Self::Aborted
        )
    }

    /// Server error code, when present.
    #[must_use]
    pub fn server_code(&self) -> Option<i64> {
        match self {
            Self::Server { code, .. } => *code,
            _ => None,
        }
    }
}
