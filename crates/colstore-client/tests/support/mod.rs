//! In-process mock server for driver integration tests.
//!
//! Speaks just enough HTTP/1.1 to exercise the client: keep-alive request
//! loops, fixed and chunked bodies both directions, scripted delays and
//! stalls. Each test supplies a handler closure; the server records
//! connection and concurrency counters the tests assert on.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code)] // Not every test file uses every helper.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use colstore_client::Config;

/// A parsed incoming request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// What the handler wants sent back.
pub enum Reply {
    /// Fixed-length response.
    Full { status: u16, body: Vec<u8> },
    /// Fixed-length response after a pause (simulates a slow query).
    DelayedFull {
        delay: Duration,
        status: u16,
        body: Vec<u8>,
    },
    /// Chunked response, one wire chunk per entry.
    Chunked { status: u16, chunks: Vec<Vec<u8>> },
    /// Chunked response that sends one chunk and then never finishes.
    Stall { status: u16, first_chunk: Vec<u8> },
}

pub type Handler = Arc<dyn Fn(Request) -> Reply + Send + Sync>;

pub struct MockServer {
    pub addr: SocketAddr,
    /// Sockets accepted since start.
    pub connections: Arc<AtomicUsize>,
    /// Requests currently being served.
    pub active: Arc<AtomicUsize>,
    /// High-water mark of `active`.
    pub max_active: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

impl MockServer {
    pub async fn start(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        let server = Self {
            addr,
            connections: connections.clone(),
            active: active.clone(),
            max_active: max_active.clone(),
            shutdown: shutdown.clone(),
        };

        tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    () = shutdown.cancelled() => break,
                    accepted = listener.accept() => accepted,
                };
                let Ok((stream, _)) = accepted else { break };
                connections.fetch_add(1, Ordering::SeqCst);
                let handler = handler.clone();
                let active = active.clone();
                let max_active = max_active.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let _ = serve_connection(stream, handler, active, max_active, shutdown).await;
                });
            }
        });

        server
    }

    /// A client config pointing at this server, tuned for tests.
    pub fn config(&self) -> Config {
        Config::new()
            .host(self.addr.ip().to_string())
            .port(self.addr.port())
            .idle_timeout(Duration::from_secs(60))
            .shutdown_grace(Duration::from_millis(200))
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    handler: Handler,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    loop {
        let Some(request) = read_request(&mut stream, &mut buf).await? else {
            return Ok(());
        };

        let current = active.fetch_add(1, Ordering::SeqCst) + 1;
        max_active.fetch_max(current, Ordering::SeqCst);
        let reply = handler(request);
        let outcome = write_reply(&mut stream, reply, &shutdown).await;
        active.fetch_sub(1, Ordering::SeqCst);
        match outcome? {
            ConnectionState::KeepAlive => {}
            ConnectionState::Close => return Ok(()),
        }
    }
}

enum ConnectionState {
    KeepAlive,
    Close,
}

async fn write_reply(
    stream: &mut TcpStream,
    reply: Reply,
    shutdown: &CancellationToken,
) -> std::io::Result<ConnectionState> {
    match reply {
        Reply::Full { status, body } => {
            write_fixed(stream, status, &body).await?;
            Ok(ConnectionState::KeepAlive)
        }
        Reply::DelayedFull {
            delay,
            status,
            body,
        } => {
            tokio::time::sleep(delay).await;
            write_fixed(stream, status, &body).await?;
            Ok(ConnectionState::KeepAlive)
        }
        Reply::Chunked { status, chunks } => {
            write_chunked_head(stream, status).await?;
            for chunk in chunks {
                write_chunk(stream, &chunk).await?;
            }
            stream.write_all(b"0\r\n\r\n").await?;
            Ok(ConnectionState::KeepAlive)
        }
        Reply::Stall {
            status,
            first_chunk,
        } => {
            write_chunked_head(stream, status).await?;
            write_chunk(stream, &first_chunk).await?;
            // Hold the exchange open until the server shuts down.
            shutdown.cancelled().await;
            Ok(ConnectionState::Close)
        }
    }
}

async fn write_fixed(stream: &mut TcpStream, status: u16, body: &[u8]) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n",
        reason(status),
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await
}

async fn write_chunked_head(stream: &mut TcpStream, status: u16) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\n\r\n",
        reason(status)
    );
    stream.write_all(head.as_bytes()).await?;
    stream.flush().await
}

async fn write_chunk(stream: &mut TcpStream, chunk: &[u8]) -> std::io::Result<()> {
    if chunk.is_empty() {
        return Ok(());
    }
    stream
        .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
        .await?;
    stream.write_all(chunk).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

/// Read one request, or `None` on a clean close between requests.
async fn read_request(
    stream: &mut TcpStream,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<Request>> {
    let head_end = loop {
        if let Some(pos) = find_subslice(buf, b"\r\n\r\n") {
            break pos;
        }
        if read_more(stream, buf).await? == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
    };

    let head: Vec<u8> = buf.drain(..head_end + 4).collect();
    let head_text = String::from_utf8_lossy(&head[..head_end]).into_owned();
    let mut lines = head_text.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split(' ');
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let body = if headers
        .get("transfer-encoding")
        .is_some_and(|v| v.contains("chunked"))
    {
        read_chunked_body(stream, buf).await?
    } else if let Some(length) = headers.get("content-length") {
        let length: usize = length.parse().map_err(|_| std::io::ErrorKind::InvalidData)?;
        read_exact_buffered(stream, buf, length).await?
    } else {
        Vec::new()
    };

    Ok(Some(Request {
        method,
        target,
        headers,
        body,
    }))
}

async fn read_chunked_body(
    stream: &mut TcpStream,
    buf: &mut Vec<u8>,
) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let line = read_line(stream, buf).await?;
        let text = String::from_utf8_lossy(&line);
        let size = usize::from_str_radix(text.trim(), 16)
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidData))?;
        if size == 0 {
            // Trailing empty line after the terminal chunk.
            let _ = read_line(stream, buf).await?;
            return Ok(body);
        }
        let data = read_exact_buffered(stream, buf, size).await?;
        body.extend_from_slice(&data);
        // Chunk data is followed by CRLF.
        let _ = read_exact_buffered(stream, buf, 2).await?;
    }
}

async fn read_line(stream: &mut TcpStream, buf: &mut Vec<u8>) -> std::io::Result<Vec<u8>> {
    loop {
        if let Some(pos) = find_subslice(buf, b"\r\n") {
            let line: Vec<u8> = buf.drain(..pos).collect();
            buf.drain(..2);
            return Ok(line);
        }
        if read_more(stream, buf).await? == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
    }
}

async fn read_exact_buffered(
    stream: &mut TcpStream,
    buf: &mut Vec<u8>,
    n: usize,
) -> std::io::Result<Vec<u8>> {
    while buf.len() < n {
        if read_more(stream, buf).await? == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
    }
    Ok(buf.drain(..n).collect())
}

async fn read_more(stream: &mut TcpStream, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    let mut tmp = [0u8; 4096];
    let n = stream.read(&mut tmp).await?;
    buf.extend_from_slice(&tmp[..n]);
    Ok(n)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
