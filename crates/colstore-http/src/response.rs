//! Incremental response head parsing.
//!
//! The parser consumes nothing until a complete head (terminated by an empty
//! line) is buffered, so it can be called repeatedly as TCP segments arrive.

use bytes::{Buf, BytesMut};

use crate::error::WireError;

/// Terminator between the response head and the body.
const HEAD_END: &[u8] = b"\r\n\r\n";

/// A parsed HTTP/1.1 response head: status line plus headers.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// The numeric status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The reason phrase from the status line (may be empty).
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Whether the status is in the 2xx success range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with this name, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All headers in wire order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Parsed `Content-Length`, if present.
    pub fn content_length(&self) -> Result<Option<u64>, WireError> {
        match self.header("content-length") {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| WireError::InvalidContentLength(value.to_string())),
        }
    }

    /// Whether the body uses chunked transfer encoding.
    #[must_use]
    pub fn is_chunked(&self) -> bool {
        self.header("transfer-encoding")
            .is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("chunked")))
    }

    /// Whether the server will keep the connection open after this exchange.
    ///
    /// HTTP/1.1 defaults to keep-alive; only an explicit `Connection: close`
    /// marks the socket as single-use.
    #[must_use]
    pub fn is_keep_alive(&self) -> bool {
        !self
            .header("connection")
            .is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("close")))
    }
}

/// Try to parse a complete response head from `buf`.
///
/// Returns `Ok(None)` until the terminating empty line has been buffered; on
/// success the head bytes are consumed from `buf`, leaving any body bytes in
/// place. `max_head_bytes` bounds how much may accumulate before the parse is
/// abandoned.
pub fn parse_response_head(
    buf: &mut BytesMut,
    max_head_bytes: usize,
) -> Result<Option<ResponseHead>, WireError> {
    let Some(end) = find_head_end(buf) else {
        if buf.len() > max_head_bytes {
            return Err(WireError::HeadTooLarge {
                size: buf.len(),
                max: max_head_bytes,
            });
        }
        return Ok(None);
    };
    if end > max_head_bytes {
        return Err(WireError::HeadTooLarge {
            size: end,
            max: max_head_bytes,
        });
    }

    let head = buf.split_to(end);
    buf.advance(HEAD_END.len());

    let text = std::str::from_utf8(&head)
        .map_err(|_| WireError::InvalidHeader("non-UTF-8 bytes in head".to_string()))?;
    let mut lines = text.split("\r\n");

    let status_line = lines.next().unwrap_or_default();
    let (status, reason) = parse_status_line(status_line)?;

    let mut headers = Vec::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| WireError::InvalidHeader(line.to_string()))?;
        if name.is_empty() || name.contains(' ') {
            return Err(WireError::InvalidHeader(line.to_string()));
        }
        headers.push((name.to_string(), value.trim().to_string()));
    }

    Ok(Some(ResponseHead {
        status,
        reason,
        headers,
    }))
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_END.len()).position(|w| w == HEAD_END)
}

fn parse_status_line(line: &str) -> Result<(u16, String), WireError> {
    let invalid = || WireError::InvalidStatusLine(line.to_string());

    let rest = line.strip_prefix("HTTP/1.").ok_or_else(invalid)?;
    // Skip the minor version digit and the following space.
    let mut parts = rest.splitn(3, ' ');
    let minor = parts.next().ok_or_else(invalid)?;
    if minor.len() != 1 || !minor.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .filter(|s| (100..600).contains(s))
        .ok_or_else(invalid)?;
    let reason = parts.next().unwrap_or_default().to_string();
    Ok((status, reason))
}
