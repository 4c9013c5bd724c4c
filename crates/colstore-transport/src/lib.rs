//! # colstore-transport
//!
//! Socket transport for the column-store driver: opening a plain or
//! TLS-encrypted connection to a server endpoint on demand.
//!
//! The connection pool consumes this crate through the [`Dial`] capability
//! trait, so tests can substitute in-memory sockets and the pool never
//! couples itself to real networking.
//!
//! ## Features
//!
//! - [`Endpoint`]: server address + default database, the pool partition key
//! - [`Connector`]: production dialer with connect timeout and optional TLS
//! - rustls with webpki roots, a PEM CA file, or (for development) disabled
//!   certificate verification

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod connector;
pub mod dial;
pub mod endpoint;
pub mod error;
pub mod tls;

pub use connector::Connector;
pub use dial::{BoxedSocket, Dial, Socket};
pub use endpoint::Endpoint;
pub use error::TransportError;
pub use tls::TlsConfig;
