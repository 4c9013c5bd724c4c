//! Request head encoding.
//!
//! A request head is the request line plus headers, terminated by an empty
//! line. Body framing (fixed-length or chunked) is layered on top by the
//! codec crate.

use bytes::{BufMut, BytesMut};

/// HTTP request method.
///
/// The driver only ever issues `GET` (ping, liveness) and `POST` (queries and
/// inserts), so the enum is deliberately closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET` request.
    Get,
    /// `POST` request.
    Post,
}

impl Method {
    /// Wire representation of the method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// An encodable HTTP/1.1 request head.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    target: String,
    headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Create a request head for `target` (path plus optional query string).
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Vec::new(),
        }
    }

    /// Append a header. Duplicate names are sent in insertion order.
    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Builder-style variant of [`push_header`](Self::push_header).
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_header(name, value);
        self
    }

    /// Whether a header with this name is already present (case-insensitive).
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// The request target (path plus query string).
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Encode the request line, headers, and terminating empty line.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len_hint());
        dst.put_slice(self.method.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.target.as_bytes());
        dst.put_slice(b" HTTP/1.1\r\n");
        for (name, value) in &self.headers {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
    }

    fn encoded_len_hint(&self) -> usize {
        let headers: usize = self.headers.iter().map(|(n, v)| n.len() + v.len() + 4).sum();
        self.method.as_str().len() + self.target.len() + 12 + headers + 2
    }
}
