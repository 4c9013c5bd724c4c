//! # colstore-http
//!
//! Pure HTTP/1.1 client-side wire protocol for the column-store driver.
//!
//! This crate contains the byte-level request/response machinery and nothing
//! else: no sockets, no async runtime. The async framing layer lives in
//! `colstore-codec`, which drives these types through tokio-util's codec
//! framework.
//!
//! ## Features
//!
//! - Request head encoding (request line + headers)
//! - Incremental response head parsing across TCP segment boundaries
//! - Chunked transfer-encoding framing in both directions
//! - Percent-encoded query string construction

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod chunked;
pub mod error;
pub mod params;
pub mod request;
pub mod response;

pub use chunked::{ChunkEvent, ChunkedDecoder, encode_chunk, encode_final_chunk};
pub use error::WireError;
pub use params::QueryParams;
pub use request::{Method, RequestHead};
pub use response::{ResponseHead, parse_response_head};
