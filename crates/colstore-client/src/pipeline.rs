//! The request/response pipeline.
//!
//! `execute` drives one operation end to end: acquire a pooled connection,
//! write the head and body (fixed buffer or live chunk stream), read the
//! response head eagerly, and hand the body back as a lazily consumed chunk
//! stream that owns the connection until it is drained or abandoned.
//!
//! One deadline spans the whole operation: acquisition, dispatch, and the
//! full response drain. Every await is raced against it and against the
//! operation's abort tokens, and every exit path releases the connection
//! exactly once with the correct health classification.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use colstore_codec::{CodecError, RequestFrame, ResponseFrame};
use colstore_driver_pool::{Pool, PooledConn};
use colstore_http::{Method, QueryParams, RequestHead, ResponseHead};
use colstore_transport::Endpoint;

use crate::error::Error;
use crate::logger::{Log, LogEntry};

/// Retained prefix of a non-2xx response body.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// A lazily produced sequence of encoded body chunks.
pub(crate) type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// Request body source.
pub(crate) enum Body {
    /// No body.
    Empty,
    /// A fixed buffer, sent with `Content-Length`.
    Full(Bytes),
    /// A live chunk stream, sent with chunked transfer encoding.
    Stream(ChunkStream),
}

/// Everything needed to drive one operation.
pub(crate) struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub params: QueryParams,
    pub headers: Vec<(String, String)>,
    pub body: Body,
    pub timeout: Duration,
    pub abort: CancellationToken,
}

/// Deadline and abort scope shared by every await of one operation.
struct OpContext {
    deadline: Instant,
    timeout: Duration,
    abort: CancellationToken,
    root: CancellationToken,
}

impl OpContext {
    /// Race `fut` against the operation deadline and both abort tokens.
    async fn run<F, T>(&self, fut: F) -> Result<T, Error>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            () = self.root.cancelled() => Err(Error::Aborted),
            () = self.abort.cancelled() => Err(Error::Aborted),
            () = tokio::time::sleep_until(self.deadline) => Err(Error::Timeout(self.timeout)),
            out = fut => Ok(out),
        }
    }
}

/// The pipeline: pool plus the client-wide scope it operates in.
pub(crate) struct Pipeline {
    pool: Pool,
    endpoint: Endpoint,
    root: CancellationToken,
    log: Log,
}

impl Pipeline {
    pub(crate) fn new(pool: Pool, endpoint: Endpoint, root: CancellationToken, log: Log) -> Self {
        Self {
            pool,
            endpoint,
            root,
            log,
        }
    }

    pub(crate) fn pool(&self) -> &Pool {
        &self.pool
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Drive a request to the point where the response head is known.
    pub(crate) async fn execute(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<ResponseHandle, Error> {
        let RequestDescriptor {
            method,
            path,
            params,
            headers,
            body,
            timeout,
            abort,
        } = descriptor;

        let target = params.render_target(&path);
        let endpoint_text = self.endpoint.to_string();
        let target_text = format!("{} {}", method.as_str(), target);
        self.log.debug(&LogEntry {
            module: "pipeline",
            message: "dispatching request",
            endpoint: Some(&endpoint_text),
            target: Some(&target_text),
            status: None,
        });

        let ctx = OpContext {
            deadline: Instant::now() + timeout,
            timeout,
            abort,
            root: self.root.clone(),
        };

        // Acquisition counts against the operation deadline: a full pool
        // surfaces as a timeout here rather than an indefinite wait.
        let mut conn = ctx.run(self.pool.acquire(&self.endpoint)).await??;

        let mut head = RequestHead::new(method, target);
        head.push_header("Host", conn.endpoint().authority());
        head.push_header("Connection", "keep-alive");
        for (name, value) in headers {
            head.push_header(name, value);
        }
        match &body {
            Body::Empty => {
                if method == Method::Post {
                    head.push_header("Content-Length", "0");
                }
            }
            Body::Full(data) => head.push_header("Content-Length", data.len().to_string()),
            Body::Stream(_) => head.push_header("Transfer-Encoding", "chunked"),
        }

        let response_head = match Self::drive(&ctx, &mut conn, head, body).await {
            Ok(head) => head,
            Err(error) => {
                self.log.error(&LogEntry {
                    module: "pipeline",
                    message: "request failed",
                    endpoint: Some(&endpoint_text),
                    target: Some(&target_text),
                    status: None,
                });
                // A half-written request or unread response poisons the
                // socket regardless of which side faulted.
                conn.release(false);
                return Err(error);
            }
        };

        self.log.debug(&LogEntry {
            module: "pipeline",
            message: "response received",
            endpoint: Some(&endpoint_text),
            target: Some(&target_text),
            status: Some(response_head.status()),
        });

        if response_head.is_success() {
            let keep_alive = response_head.is_keep_alive();
            return Ok(ResponseHandle {
                head: response_head,
                body: BodyStream {
                    conn: Some(conn),
                    keep_alive,
                    ctx,
                    done: false,
                },
            });
        }

        // Server-level error: the TCP connection is still well-formed, so
        // drain the error body and return the connection for reuse.
        match Self::drain_error_body(&ctx, &mut conn).await {
            Ok(body_text) => {
                conn.release(response_head.is_keep_alive());
                Err(classify_server_error(&response_head, &body_text))
            }
            Err(error) => {
                conn.release(false);
                Err(error)
            }
        }
    }

    async fn drive(
        ctx: &OpContext,
        conn: &mut PooledConn,
        head: RequestHead,
        body: Body,
    ) -> Result<ResponseHead, Error> {
        ctx.run(conn.send(RequestFrame::Head(head))).await??;

        match body {
            Body::Empty => {}
            Body::Full(data) => {
                ctx.run(conn.send(RequestFrame::Body(data))).await??;
            }
            Body::Stream(mut chunks) => {
                // One send per chunk: the producer is not polled for record
                // k+1 until the transport has accepted chunk k.
                while let Some(chunk) = ctx.run(chunks.next()).await? {
                    let chunk = chunk?;
                    ctx.run(conn.send(RequestFrame::Chunk(chunk))).await??;
                }
                ctx.run(conn.send(RequestFrame::End)).await??;
            }
        }

        match ctx.run(conn.next_frame()).await?? {
            ResponseFrame::Head(head) => Ok(head),
            _ => Err(Error::Codec(CodecError::ConnectionClosed)),
        }
    }

    async fn drain_error_body(ctx: &OpContext, conn: &mut PooledConn) -> Result<String, Error> {
        let mut buf: Vec<u8> = Vec::new();
        loop {
            match ctx.run(conn.next_frame()).await?? {
                ResponseFrame::Chunk(data) => {
                    let room = MAX_ERROR_BODY.saturating_sub(buf.len());
                    buf.extend_from_slice(&data[..data.len().min(room)]);
                }
                ResponseFrame::End => break,
                ResponseFrame::Head(_) => return Err(Error::Codec(CodecError::ConnectionClosed)),
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// An executed request: eager head, lazy body.
pub(crate) struct ResponseHandle {
    pub head: ResponseHead,
    pub body: BodyStream,
}

/// Lazily consumed response body.
///
/// Owns the pooled connection until the body is drained (released healthy,
/// unless the server asked to close), fails (released unhealthy), or is
/// dropped unconsumed (the guard's own drop releases unhealthy). Each
/// outcome releases exactly once.
pub(crate) struct BodyStream {
    conn: Option<PooledConn>,
    keep_alive: bool,
    ctx: OpContext,
    done: bool,
}

impl BodyStream {
    /// Pull the next chunk of body data.
    ///
    /// Returns `None` once the body is complete. The operation deadline
    /// keeps running here: a consumer that stalls past it gets a `Timeout`
    /// error and the connection is discarded.
    pub(crate) async fn next_chunk(&mut self) -> Option<Result<Bytes, Error>> {
        if self.done {
            return None;
        }
        let conn = self.conn.as_mut()?;
        match self.ctx.run(conn.next_frame()).await {
            Ok(Ok(ResponseFrame::Chunk(data))) => Some(Ok(data)),
            Ok(Ok(ResponseFrame::End)) => {
                self.done = true;
                if let Some(conn) = self.conn.take() {
                    conn.release(self.keep_alive);
                }
                None
            }
            Ok(Ok(ResponseFrame::Head(_))) => {
                Some(self.fail(Error::Codec(CodecError::ConnectionClosed)))
            }
            Ok(Err(codec_error)) => Some(self.fail(Error::Codec(codec_error))),
            Err(error) => Some(self.fail(error)),
        }
    }

    fn fail(&mut self, error: Error) -> Result<Bytes, Error> {
        self.done = true;
        if let Some(conn) = self.conn.take() {
            conn.release(false);
        }
        Err(error)
    }
}

impl std::fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyStream")
            .field("done", &self.done)
            .field("keep_alive", &self.keep_alive)
            .finish()
    }
}

fn classify_server_error(head: &ResponseHead, body: &str) -> Error {
    let message = body.trim();
    let message = if message.is_empty() {
        head.reason()
    } else {
        message
    };
    Error::Server {
        code: parse_error_code(message),
        status: head.status(),
        message: message.to_string(),
    }
}

/// Extract the numeric code from a `Code: <n>. ...` error body prefix.
fn parse_error_code(message: &str) -> Option<i64> {
    let rest = message.strip_prefix("Code:")?.trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    rest[..end].parse().ok()
}
