//! Query string construction.

/// An ordered set of query parameters rendered as a percent-encoded string.
///
/// Parameter order is preserved so that request targets are stable for a
/// given configuration, which keeps server-side query logs readable.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Whether no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Render `path` plus the encoded query string as a request target.
    #[must_use]
    pub fn render_target(&self, path: &str) -> String {
        if self.pairs.is_empty() {
            return path.to_string();
        }
        let mut out = String::with_capacity(path.len() + 16 * self.pairs.len());
        out.push_str(path);
        for (i, (name, value)) in self.pairs.iter().enumerate() {
            out.push(if i == 0 { '?' } else { '&' });
            percent_encode_into(name, &mut out);
            out.push('=');
            percent_encode_into(value, &mut out);
        }
        out
    }
}

/// Percent-encode `input` per RFC 3986, leaving only unreserved characters.
#[must_use]
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    percent_encode_into(input, &mut out);
    out
}

fn percent_encode_into(input: &str, out: &mut String) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push(HEX[(byte >> 4) as usize] as char);
                out.push(HEX[(byte & 0xf) as usize] as char);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty() {
        let params = QueryParams::new();
        assert_eq!(params.render_target("/"), "/");
    }

    #[test]
    fn test_render_multiple() {
        let mut params = QueryParams::new();
        params.push("database", "default");
        params.push("query", "SELECT 1");
        assert_eq!(
            params.render_target("/"),
            "/?database=default&query=SELECT%201"
        );
    }

    #[test]
    fn test_percent_encode_reserved() {
        assert_eq!(percent_encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(percent_encode("safe-._~09AZ"), "safe-._~09AZ");
    }

    #[test]
    fn test_percent_encode_utf8() {
        assert_eq!(percent_encode("é"), "%C3%A9");
    }
}
