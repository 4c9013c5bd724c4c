//! Format error types.

use thiserror::Error;

/// Errors raised while encoding or decoding rows.
///
/// These are data problems, not transport problems: the connection that
/// carried the bytes is unaffected.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A row could not be serialized.
    #[error("cannot encode row: {0}")]
    Encode(String),

    /// A row could not be parsed.
    #[error("cannot parse row {row}: {message}")]
    Parse {
        /// 1-based index of the offending row.
        row: u64,
        /// Parser diagnostic.
        message: String,
    },

    /// The input ended in the middle of a record.
    #[error("input ended mid-record ({len} bytes buffered)")]
    TrailingPartial {
        /// Buffered bytes that never formed a complete record.
        len: usize,
    },
}
