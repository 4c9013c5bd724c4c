//! The dialing capability consumed by the connection pool.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::endpoint::Endpoint;
use crate::error::TransportError;

/// A bidirectional byte stream usable as a pooled connection's socket.
pub trait Socket: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Socket for T {}

/// An opened socket, type-erased over plain TCP, TLS, or test doubles.
pub type BoxedSocket = Box<dyn Socket>;

/// Capability to open a new socket to an endpoint on demand.
///
/// The pool calls this exactly once per connection it creates; everything
/// else (reuse, lifetime, teardown) is the pool's business. Tests implement
/// it over in-memory duplex pipes.
#[async_trait]
pub trait Dial: Send + Sync {
    /// Open a new socket to `endpoint`.
    async fn dial(&self, endpoint: &Endpoint) -> Result<BoxedSocket, TransportError>;
}
