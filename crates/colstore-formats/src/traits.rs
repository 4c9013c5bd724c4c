//! The format codec interface.

use bytes::BytesMut;

use crate::error::FormatError;

/// Wire identity of a row format.
pub trait Format {
    /// The format name, as used in a `FORMAT` clause.
    fn name(&self) -> &'static str;

    /// The HTTP content type for bodies in this format.
    fn content_type(&self) -> &'static str;
}

/// Streaming encoder: one record in, one self-delimiting chunk out.
pub trait RowEncoder<T>: Send {
    /// Append the wire representation of `row` to `dst`.
    fn encode(&mut self, row: &T, dst: &mut BytesMut) -> Result<(), FormatError>;
}

/// Streaming decoder fed raw body chunks in arrival order.
///
/// A record may span any number of chunks; the decoder buffers partial
/// records internally and yields each record exactly once, in wire order.
pub trait RowDecoder<T>: Send {
    /// Feed one raw chunk. Chunk boundaries carry no meaning.
    fn feed(&mut self, chunk: &[u8]);

    /// Pull the next complete record, if one is buffered.
    fn try_next(&mut self) -> Result<Option<T>, FormatError>;

    /// Signal end of input. Fails if a partial record is still buffered.
    fn finish(&mut self) -> Result<(), FormatError>;
}
