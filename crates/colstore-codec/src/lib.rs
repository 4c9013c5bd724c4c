//! # colstore-codec
//!
//! Async framing layer for the driver's HTTP exchanges.
//!
//! This crate transforms raw byte streams into request/response frames,
//! handling head reassembly across TCP segment boundaries, both body framings
//! (content-length and chunked), and decoder reset between keep-alive
//! exchanges.
//!
//! ## Features
//!
//! - Response reassembly across TCP segments
//! - Chunked request bodies with per-chunk transport backpressure
//! - Integration with tokio-util's codec framework

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod connection;
pub mod error;
pub mod framed;
pub mod http_codec;

pub use connection::HttpConnection;
pub use error::CodecError;
pub use framed::HttpStream;
pub use http_codec::{HttpClientCodec, RequestFrame, ResponseFrame};
