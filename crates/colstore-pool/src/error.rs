//! Pool error types.

use thiserror::Error;

/// Errors returned by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool has been closed; no further acquisitions are possible.
    #[error("pool closed")]
    Closed,

    /// Opening a new connection failed.
    #[error("transport error: {0}")]
    Transport(#[from] colstore_transport::TransportError),

    /// The pool configuration is invalid.
    #[error("invalid pool configuration: {0}")]
    Config(String),
}
