//! Client-side HTTP/1.1 codec.
//!
//! Encodes outgoing request frames and decodes the server's response into a
//! `Head` / `Chunk`* / `End` frame sequence. After `End` the decoder resets
//! so the next keep-alive exchange on the same socket starts cleanly.

use bytes::{Bytes, BytesMut};
use colstore_http::{
    ChunkEvent, ChunkedDecoder, RequestHead, ResponseHead, encode_chunk, encode_final_chunk,
    parse_response_head,
};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// Default cap on a buffered response head.
pub const DEFAULT_MAX_HEAD_BYTES: usize = 64 * 1024;

/// An outgoing frame.
#[derive(Debug)]
pub enum RequestFrame {
    /// Request line plus headers.
    Head(RequestHead),
    /// Raw body bytes for a fixed-length (`Content-Length`) body.
    Body(Bytes),
    /// One chunk of a chunked (streamed) body.
    Chunk(Bytes),
    /// Terminal chunk of a chunked body.
    End,
}

/// An incoming frame.
#[derive(Debug)]
pub enum ResponseFrame {
    /// Status line plus headers, emitted once per exchange.
    Head(ResponseHead),
    /// A slice of decoded body data.
    Chunk(Bytes),
    /// The body is complete; the codec has reset for the next exchange.
    End,
}

#[derive(Debug)]
enum ReadState {
    /// Waiting for (more of) the response head.
    Head,
    /// Reading a `Content-Length` body.
    FixedBody { remaining: u64 },
    /// Reading a chunked body.
    Chunked(ChunkedDecoder),
    /// No length information: body runs until the server closes.
    ReadToClose,
    /// Body already complete; emit `End` on the next poll.
    EndPending,
}

/// Encoder/decoder for one client connection.
#[derive(Debug)]
pub struct HttpClientCodec {
    max_head_bytes: usize,
    read_state: ReadState,
}

impl HttpClientCodec {
    /// Create a codec with the default head-size cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_head_bytes(DEFAULT_MAX_HEAD_BYTES)
    }

    /// Create a codec with a custom head-size cap.
    #[must_use]
    pub fn with_max_head_bytes(max_head_bytes: usize) -> Self {
        Self {
            max_head_bytes,
            read_state: ReadState::Head,
        }
    }

    /// Whether the decoder is between exchanges (no partial response buffered).
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.read_state, ReadState::Head)
    }

    fn state_after_head(head: &ResponseHead) -> Result<ReadState, CodecError> {
        if head.is_chunked() {
            return Ok(ReadState::Chunked(ChunkedDecoder::new()));
        }
        match head.content_length()? {
            Some(0) => Ok(ReadState::EndPending),
            Some(n) => Ok(ReadState::FixedBody { remaining: n }),
            None => Ok(ReadState::ReadToClose),
        }
    }
}

impl Default for HttpClientCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<RequestFrame> for HttpClientCodec {
    type Error = CodecError;

    fn encode(&mut self, item: RequestFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            RequestFrame::Head(head) => head.encode(dst),
            RequestFrame::Body(data) => dst.extend_from_slice(&data),
            RequestFrame::Chunk(data) => encode_chunk(&data, dst),
            RequestFrame::End => encode_final_chunk(dst),
        }
        Ok(())
    }
}

impl Decoder for HttpClientCodec {
    type Item = ResponseFrame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.read_state {
            ReadState::Head => match parse_response_head(src, self.max_head_bytes)? {
                None => Ok(None),
                Some(head) => {
                    self.read_state = Self::state_after_head(&head)?;
                    Ok(Some(ResponseFrame::Head(head)))
                }
            },
            ReadState::FixedBody { remaining } => {
                if src.is_empty() {
                    return Ok(None);
                }
                let take = src
                    .len()
                    .min(usize::try_from(*remaining).unwrap_or(usize::MAX));
                let data = src.split_to(take).freeze();
                *remaining -= take as u64;
                if *remaining == 0 {
                    self.read_state = ReadState::EndPending;
                }
                Ok(Some(ResponseFrame::Chunk(data)))
            }
            ReadState::Chunked(decoder) => match decoder.decode(src)? {
                None => Ok(None),
                Some(ChunkEvent::Data(data)) => Ok(Some(ResponseFrame::Chunk(data))),
                Some(ChunkEvent::End) => {
                    self.read_state = ReadState::Head;
                    Ok(Some(ResponseFrame::End))
                }
            },
            ReadState::ReadToClose => {
                if src.is_empty() {
                    return Ok(None);
                }
                let data = src.split().freeze();
                Ok(Some(ResponseFrame::Chunk(data)))
            }
            ReadState::EndPending => {
                self.read_state = ReadState::Head;
                Ok(Some(ResponseFrame::End))
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        match &self.read_state {
            // Clean close between exchanges.
            ReadState::Head if src.is_empty() => Ok(None),
            // EOF terminates an unsized body.
            ReadState::ReadToClose => {
                self.read_state = ReadState::Head;
                Ok(Some(ResponseFrame::End))
            }
            // EOF mid-head or mid-body is a transport fault.
            _ => Err(CodecError::ConnectionClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colstore_http::Method;

    fn drain(codec: &mut HttpClientCodec, src: &mut BytesMut) -> Vec<ResponseFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(src).unwrap() {
            frames.push(frame);
        }
        frames
    }

    fn body_of(frames: &[ResponseFrame]) -> Vec<u8> {
        let mut body = Vec::new();
        for frame in frames {
            if let ResponseFrame::Chunk(data) = frame {
                body.extend_from_slice(data);
            }
        }
        body
    }

    #[test]
    fn test_decode_fixed_length_response() {
        let mut codec = HttpClientCodec::new();
        let mut src = BytesMut::from(
            &b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nhello world"[..],
        );
        let frames = drain(&mut codec, &mut src);
        assert!(matches!(frames[0], ResponseFrame::Head(_)));
        assert_eq!(body_of(&frames), b"hello world");
        assert!(matches!(frames.last(), Some(ResponseFrame::End)));
        assert!(codec.is_idle());
    }

    #[test]
    fn test_decode_zero_length_response() {
        let mut codec = HttpClientCodec::new();
        let mut src = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"[..]);
        let frames = drain(&mut codec, &mut src);
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[1], ResponseFrame::End));
    }

    #[test]
    fn test_decode_chunked_response() {
        let mut codec = HttpClientCodec::new();
        let mut src = BytesMut::from(
            &b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n1\r\n \r\n5\r\nworld\r\n0\r\n\r\n"[..],
        );
        let frames = drain(&mut codec, &mut src);
        assert_eq!(body_of(&frames), b"hello world");
        assert!(matches!(frames.last(), Some(ResponseFrame::End)));
        assert!(codec.is_idle());
    }

    #[test]
    fn test_decode_two_keep_alive_exchanges() {
        let mut codec = HttpClientCodec::new();
        let mut src = BytesMut::from(
            &b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\naHTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nb"[..],
        );
        let frames = drain(&mut codec, &mut src);
        let heads = frames
            .iter()
            .filter(|f| matches!(f, ResponseFrame::Head(_)))
            .count();
        let ends = frames
            .iter()
            .filter(|f| matches!(f, ResponseFrame::End))
            .count();
        assert_eq!(heads, 2);
        assert_eq!(ends, 2);
        assert_eq!(body_of(&frames), b"ab");
    }

    #[test]
    fn test_decode_split_across_segments() {
        let mut codec = HttpClientCodec::new();
        let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nbody";
        let mut src = BytesMut::new();
        let mut frames = Vec::new();
        for byte in wire {
            src.extend_from_slice(&[*byte]);
            while let Some(frame) = codec.decode(&mut src).unwrap() {
                frames.push(frame);
            }
        }
        assert!(matches!(frames[0], ResponseFrame::Head(_)));
        assert_eq!(body_of(&frames), b"body");
        assert!(matches!(frames.last(), Some(ResponseFrame::End)));
    }

    #[test]
    fn test_decode_eof_terminates_unsized_body() {
        let mut codec = HttpClientCodec::new();
        let mut src = BytesMut::from(&b"HTTP/1.1 200 OK\r\n\r\nstreamed"[..]);
        let frames = drain(&mut codec, &mut src);
        assert_eq!(body_of(&frames), b"streamed");
        // Socket closes: decode_eof finishes the body.
        let end = codec.decode_eof(&mut src).unwrap();
        assert!(matches!(end, Some(ResponseFrame::End)));
        assert!(codec.decode_eof(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_decode_eof_mid_body_is_error() {
        let mut codec = HttpClientCodec::new();
        let mut src = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort"[..]);
        let _ = drain(&mut codec, &mut src);
        assert!(matches!(
            codec.decode_eof(&mut src),
            Err(CodecError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_encode_chunked_request() {
        let mut codec = HttpClientCodec::new();
        let mut dst = BytesMut::new();
        let head = RequestHead::new(Method::Post, "/").header("Transfer-Encoding", "chunked");
        codec.encode(RequestFrame::Head(head), &mut dst).unwrap();
        codec
            .encode(RequestFrame::Chunk(Bytes::from_static(b"row1\n")), &mut dst)
            .unwrap();
        codec.encode(RequestFrame::End, &mut dst).unwrap();
        let text = String::from_utf8(dst.to_vec()).unwrap();
        assert!(text.starts_with("POST / HTTP/1.1\r\n"));
        assert!(text.contains("5\r\nrow1\n\r\n"));
        assert!(text.ends_with("0\r\n\r\n"));
    }
}
