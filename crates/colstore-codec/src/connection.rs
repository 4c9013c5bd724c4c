//! A framed connection with pool-visible identity.

use std::time::Instant;

use colstore_transport::{BoxedSocket, Endpoint};
use futures_util::{SinkExt, StreamExt};

use crate::error::CodecError;
use crate::framed::HttpStream;
use crate::http_codec::{RequestFrame, ResponseFrame};

/// One physical connection: a framed socket plus identity metadata.
///
/// Ownership is always exclusive: the pool holds the connection while idle
/// and exactly one in-flight request holds it otherwise, so no method here
/// needs interior synchronization.
pub struct HttpConnection {
    id: u64,
    endpoint: Endpoint,
    stream: HttpStream<BoxedSocket>,
    created_at: Instant,
}

impl HttpConnection {
    /// Wrap a freshly dialed socket.
    #[must_use]
    pub fn new(id: u64, endpoint: Endpoint, socket: BoxedSocket) -> Self {
        Self {
            id,
            endpoint,
            stream: HttpStream::new(socket),
            created_at: Instant::now(),
        }
    }

    /// Pool-assigned connection id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The endpoint this connection was opened against.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// When the underlying socket was opened.
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Send one frame and flush it to the socket.
    ///
    /// `send` completes only once the transport has accepted the bytes, which
    /// is what propagates socket backpressure to streamed-body producers: the
    /// write for chunk *k+1* cannot start until chunk *k* has been taken.
    pub async fn send(&mut self, frame: RequestFrame) -> Result<(), CodecError> {
        self.stream.send(frame).await
    }

    /// Receive the next response frame.
    ///
    /// A stream that ends without a frame means the server closed the socket
    /// mid-exchange.
    pub async fn next_frame(&mut self) -> Result<ResponseFrame, CodecError> {
        match self.stream.next().await {
            Some(frame) => frame,
            None => {
                tracing::debug!(connection_id = self.id, "server closed connection mid-exchange");
                Err(CodecError::ConnectionClosed)
            }
        }
    }

    /// Whether the codec is between exchanges.
    ///
    /// False when a response is partially consumed; such a connection cannot
    /// be reused and must be discarded.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.stream.codec().is_idle() && self.stream.read_buffer().is_empty()
    }
}

impl std::fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("age", &self.created_at.elapsed())
            .finish()
    }
}
