//! Production dialer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::dial::{BoxedSocket, Dial};
use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::tls::TlsConfig;

/// Opens plain or TLS sockets to endpoints, with a connect timeout.
///
/// The rustls client configuration is built once at construction and shared
/// across all handshakes.
pub struct Connector {
    connect_timeout: Duration,
    tls: TlsConnector,
}

impl Connector {
    /// Default connect timeout.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Build a connector from TLS settings.
    pub fn new(tls: &TlsConfig, connect_timeout: Duration) -> Result<Self, TransportError> {
        let client_config = tls.build_client_config()?;
        Ok(Self {
            connect_timeout,
            tls: TlsConnector::from(Arc::new(client_config)),
        })
    }

    async fn dial_inner(&self, endpoint: &Endpoint) -> Result<BoxedSocket, TransportError> {
        let tcp = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
        tcp.set_nodelay(true)?;

        if !endpoint.secure {
            return Ok(Box::new(tcp));
        }

        let name = ServerName::try_from(endpoint.host.clone())
            .map_err(|_| TransportError::InvalidServerName(endpoint.host.clone()))?;
        let stream = self
            .tls
            .connect(name, tcp)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        Ok(Box::new(stream))
    }
}

#[async_trait]
impl Dial for Connector {
    async fn dial(&self, endpoint: &Endpoint) -> Result<BoxedSocket, TransportError> {
        tracing::debug!(endpoint = %endpoint, "opening connection");
        match tokio::time::timeout(self.connect_timeout, self.dial_inner(endpoint)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::ConnectTimeout(self.connect_timeout)),
        }
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_dial_plain() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf).await.unwrap();
        });

        let connector =
            Connector::new(&TlsConfig::new(), Connector::DEFAULT_CONNECT_TIMEOUT).unwrap();
        let endpoint = Endpoint::new(addr.ip().to_string(), addr.port(), false, "default");
        let mut socket = connector.dial(&endpoint).await.unwrap();

        socket.write_all(b"ping").await.unwrap();
        let mut echo = [0u8; 4];
        socket.read_exact(&mut echo).await.unwrap();
        assert_eq!(&echo, b"ping");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let connector =
            Connector::new(&TlsConfig::new(), Connector::DEFAULT_CONNECT_TIMEOUT).unwrap();
        // Bind-then-drop gives a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint::new(addr.ip().to_string(), addr.port(), false, "default");
        let err = match connector.dial(&endpoint).await {
            Ok(_) => panic!("expected dial to fail"),
            Err(e) => e,
        };
        assert!(matches!(
            err,
            TransportError::Connect(_) | TransportError::ConnectTimeout(_)
        ));
    }
}
