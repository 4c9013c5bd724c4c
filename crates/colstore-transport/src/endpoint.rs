//! Server endpoint identity.

use std::fmt;

/// A server address plus default database.
///
/// Endpoints are immutable once a client is constructed and serve as the
/// connection pool's partition key: connections are only ever reused for the
/// endpoint they were opened against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Whether to connect over TLS.
    pub secure: bool,
    /// Default database for requests against this endpoint.
    pub database: String,
}

impl Endpoint {
    /// Create an endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, secure: bool, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            secure,
            database: database.into(),
        }
    }

    /// The `host:port` authority, as sent in the `Host` header.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL scheme for this endpoint.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}/{}",
            self.scheme(),
            self.host,
            self.port,
            self.database
        )
    }
}
