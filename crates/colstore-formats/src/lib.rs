//! # colstore-formats
//!
//! Row serialization formats for the column-store driver.
//!
//! A format translates between in-process values and the server's row
//! representation, one record at a time in both directions, so that neither
//! side ever needs the full dataset in memory. Decoders must tolerate chunk
//! boundaries falling anywhere, including mid-record; the shared
//! [`LineSplitter`] provides that tolerance for the newline-delimited
//! formats.
//!
//! ## Formats
//!
//! - [`JsonEachRow`]: one JSON object per line (the reference format)
//! - [`TabSeparated`]: escaped tab-separated text rows

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod json_each_row;
pub mod line;
pub mod tab_separated;
pub mod traits;

pub use error::FormatError;
pub use json_each_row::{JsonEachRow, JsonEachRowDecoder, JsonEachRowEncoder};
pub use line::LineSplitter;
pub use tab_separated::{TabSeparated, TabSeparatedDecoder, TabSeparatedEncoder};
pub use traits::{Format, RowDecoder, RowEncoder};
