//! Transport error types.

use thiserror::Error;

/// Errors that can occur while opening a connection.
///
/// Every variant is a network-level fault: a connection that produced one is
/// never returned to the pool.
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP connect or socket setup failed.
    #[error("connect failed: {0}")]
    Connect(#[from] std::io::Error),

    /// The connect did not complete within the configured timeout.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    /// The TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// The TLS configuration could not be built (bad CA file, etc.).
    #[error("invalid TLS configuration: {0}")]
    TlsConfig(String),

    /// The endpoint host is not a valid TLS server name.
    #[error("invalid server name: {0:?}")]
    InvalidServerName(String),
}
