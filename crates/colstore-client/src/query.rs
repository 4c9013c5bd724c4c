//! Query results and lazy row streams.

use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;

use colstore_formats::{JsonEachRowDecoder, RowDecoder};
use colstore_http::ResponseHead;

use crate::error::Result;
use crate::pipeline::{BodyStream, ResponseHandle};

/// The result of a successful query dispatch.
///
/// Status and headers are available immediately; the body is consumed
/// lazily, exactly once, through one of the accessors. Dropping the result
/// without consuming it discards the underlying connection.
pub struct QueryResult {
    head: ResponseHead,
    body: BodyStream,
}

impl QueryResult {
    pub(crate) fn new(handle: ResponseHandle) -> Self {
        Self {
            head: handle.head,
            body: handle.body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.head.status()
    }

    /// A response header, looked up case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    /// The response content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.head.header("content-type")
    }

    /// Drain the body into one buffer.
    pub async fn bytes(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next_chunk().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Drain the body as text. Invalid UTF-8 is replaced.
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Stream rows in the default `JSONEachRow` format.
    #[must_use]
    pub fn rows<T>(self) -> RowStream<T, JsonEachRowDecoder<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.rows_with(JsonEachRowDecoder::new())
    }

    /// Stream rows through a caller-supplied format decoder.
    #[must_use]
    pub fn rows_with<T, D: RowDecoder<T>>(self, decoder: D) -> RowStream<T, D> {
        RowStream {
            body: self.body,
            decoder,
            input_done: false,
            _marker: PhantomData,
        }
    }

    /// Collect every row into a vector.
    pub async fn json<T>(self) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.rows().collect().await
    }
}

impl std::fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResult")
            .field("status", &self.head.status())
            .finish()
    }
}

/// A lazy, forward-only stream of decoded rows.
///
/// Rows are pulled at the caller's pace; raw chunks are fetched from the
/// connection only when the decoder runs dry, so memory stays bounded by
/// one chunk plus one partial record regardless of result size.
pub struct RowStream<T, D> {
    body: BodyStream,
    decoder: D,
    input_done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T, D: RowDecoder<T>> RowStream<T, D> {
    /// Pull the next row, or `None` once the body is exhausted.
    pub async fn try_next(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(row) = self.decoder.try_next()? {
                return Ok(Some(row));
            }
            if self.input_done {
                return Ok(None);
            }
            match self.body.next_chunk().await {
                Some(Ok(chunk)) => self.decoder.feed(&chunk),
                Some(Err(error)) => return Err(error),
                None => {
                    self.input_done = true;
                    self.decoder.finish()?;
                }
            }
        }
    }

    /// Drain the stream into a vector.
    pub async fn collect(mut self) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        while let Some(row) = self.try_next().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}

impl<T, D> std::fmt::Debug for RowStream<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("input_done", &self.input_done)
            .finish()
    }
}
