//! The client surface.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use colstore_driver_pool::{Pool, PoolConfig, PoolStatus};
use colstore_formats::{Format, JsonEachRow, JsonEachRowEncoder, RowEncoder};
use colstore_http::{Method, QueryParams};
use colstore_transport::Connector;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logger::{Log, NopQueryLog, QueryLog};
use crate::pipeline::{Body, Pipeline, RequestDescriptor};
use crate::query::QueryResult;
use crate::settings::Settings;

/// Per-call options for queries and inserts.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Settings merged over the client defaults, these winning on conflict.
    pub settings: Settings,
    /// Deadline override for this operation.
    pub timeout: Option<Duration>,
    /// Abort token: cancelling it unwinds the operation.
    pub abort: Option<CancellationToken>,
}

impl RequestOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set per-call settings.
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Override the operation deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach an abort token.
    #[must_use]
    pub fn abort(mut self, token: CancellationToken) -> Self {
        self.abort = Some(token);
        self
    }
}

/// Async client for a column-store server's HTTP interface.
///
/// An explicit, constructed value: clone it freely (clones share the pool)
/// and pass it wherever operations are issued. There is no ambient global
/// client.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: Config,
    pipeline: Pipeline,
    root: CancellationToken,
}

impl Client {
    /// Create a client with the no-op query log.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_query_log(config, Arc::new(NopQueryLog))
    }

    /// Create a client logging through `sink`.
    pub fn with_query_log(config: Config, sink: Arc<dyn QueryLog>) -> Result<Self> {
        config.validate()?;

        let endpoint = config.endpoint();
        let connector = Connector::new(&config.tls, config.connect_timeout)?;
        let pool_config = PoolConfig::new()
            .max_connections_per_endpoint(config.max_open_connections)
            .idle_timeout(config.idle_timeout);
        let pool = Pool::new(pool_config, Arc::new(connector))?;

        let root = CancellationToken::new();
        let log = Log::new(config.log_level, sink);
        let pipeline = Pipeline::new(pool, endpoint, root.clone(), log);

        tracing::info!(
            endpoint = %pipeline.endpoint(),
            max_open_connections = config.max_open_connections,
            "client created"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                pipeline,
                root,
            }),
        })
    }

    /// Run a query and stream its result.
    ///
    /// `FORMAT JSONEachRow` is appended when the statement carries no
    /// explicit `FORMAT` clause, so [`QueryResult::rows`] and
    /// [`QueryResult::json`] work out of the box.
    pub async fn query(&self, sql: &str) -> Result<QueryResult> {
        self.query_with(sql, RequestOptions::default()).await
    }

    /// [`query`](Self::query) with per-call options.
    pub async fn query_with(&self, sql: &str, options: RequestOptions) -> Result<QueryResult> {
        let sql = append_default_format(sql, JsonEachRow.name());
        let params = self.base_params(&options.settings);
        let descriptor = self.descriptor(
            Method::Post,
            "/",
            params,
            self.base_headers(),
            Body::Full(Bytes::from(sql)),
            &options,
        );
        let handle = self.inner.pipeline.execute(descriptor).await?;
        Ok(QueryResult::new(handle))
    }

    /// Run a statement that returns no rows (DDL, `SET`, mutations).
    pub async fn execute(&self, sql: &str) -> Result<()> {
        self.execute_with(sql, RequestOptions::default()).await
    }

    /// [`execute`](Self::execute) with per-call options.
    pub async fn execute_with(&self, sql: &str, options: RequestOptions) -> Result<()> {
        let params = self.base_params(&options.settings);
        let descriptor = self.descriptor(
            Method::Post,
            "/",
            params,
            self.base_headers(),
            Body::Full(Bytes::copy_from_slice(sql.as_bytes())),
            &options,
        );
        let handle = self.inner.pipeline.execute(descriptor).await?;
        QueryResult::new(handle).bytes().await?;
        Ok(())
    }

    /// Insert a fixed collection of rows as `JSONEachRow`.
    pub async fn insert<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<()> {
        self.insert_with(table, rows, RequestOptions::default()).await
    }

    /// [`insert`](Self::insert) with per-call options.
    pub async fn insert_with<T: Serialize>(
        &self,
        table: &str,
        rows: &[T],
        options: RequestOptions,
    ) -> Result<()> {
        let mut encoder = JsonEachRowEncoder;
        let mut buf = BytesMut::new();
        for row in rows {
            encoder.encode(row, &mut buf)?;
        }
        self.dispatch_insert(table, &JsonEachRow, Body::Full(buf.freeze()), options)
            .await
    }

    /// Insert a live stream of rows as `JSONEachRow`.
    ///
    /// Rows are encoded and written one at a time under transport
    /// backpressure: the stream is not polled for the next row until the
    /// socket has accepted the previous one, so an unbounded producer never
    /// forces unbounded buffering.
    pub async fn insert_stream<T, S>(&self, table: &str, rows: S) -> Result<()>
    where
        T: Serialize,
        S: Stream<Item = T> + Send + 'static,
    {
        self.insert_stream_with(table, rows, RequestOptions::default())
            .await
    }

    /// [`insert_stream`](Self::insert_stream) with per-call options.
    pub async fn insert_stream_with<T, S>(
        &self,
        table: &str,
        rows: S,
        options: RequestOptions,
    ) -> Result<()>
    where
        T: Serialize,
        S: Stream<Item = T> + Send + 'static,
    {
        let chunks = rows.map(|row| {
            let mut encoder = JsonEachRowEncoder;
            let mut buf = BytesMut::new();
            encoder
                .encode(&row, &mut buf)
                .map(|()| buf.freeze())
                .map_err(Error::from)
        });
        self.dispatch_insert(table, &JsonEachRow, Body::Stream(Box::pin(chunks)), options)
            .await
    }

    /// Insert a caller-encoded payload in any format.
    pub async fn insert_raw(
        &self,
        table: &str,
        format: &dyn Format,
        payload: Bytes,
    ) -> Result<()> {
        self.dispatch_insert(table, format, Body::Full(payload), RequestOptions::default())
            .await
    }

    async fn dispatch_insert(
        &self,
        table: &str,
        format: &dyn Format,
        body: Body,
        options: RequestOptions,
    ) -> Result<()> {
        validate_table_name(table)?;
        let mut params = self.base_params(&options.settings);
        params.push("query", format!("INSERT INTO {table} FORMAT {}", format.name()));
        let mut headers = self.base_headers();
        headers.push(("Content-Type".to_string(), format.content_type().to_string()));

        let descriptor = self.descriptor(Method::Post, "/", params, headers, body, &options);
        let handle = self.inner.pipeline.execute(descriptor).await?;
        // Drain the (normally empty) acknowledgement body so the connection
        // goes back to the pool clean.
        QueryResult::new(handle).bytes().await?;
        Ok(())
    }

    /// Liveness probe against the server's `/ping` handler.
    pub async fn ping(&self) -> Result<()> {
        let descriptor = self.descriptor(
            Method::Get,
            "/ping",
            QueryParams::new(),
            vec![("User-Agent".to_string(), self.inner.config.application.clone())],
            Body::Empty,
            &RequestOptions::default(),
        );
        let handle = self.inner.pipeline.execute(descriptor).await?;
        let status = handle.head.status();
        let text = QueryResult::new(handle).text().await?;
        if text.trim() == "Ok." {
            Ok(())
        } else {
            Err(Error::Server {
                code: None,
                status,
                message: format!("unexpected ping response: {text:?}"),
            })
        }
    }

    /// Close the client.
    ///
    /// Waits up to the configured shutdown grace for in-flight operations to
    /// drain, then cancels whatever is left and closes the pool. Idempotent;
    /// operations issued after this fail with a pool-closed error.
    pub async fn close(&self) {
        let grace = self.inner.config.shutdown_grace;
        let deadline = tokio::time::Instant::now() + grace;
        let pool = self.inner.pipeline.pool();
        let endpoint = self.inner.pipeline.endpoint();
        while pool.status(endpoint).in_use > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        self.inner.root.cancel();
        pool.close();
        tracing::info!(endpoint = %endpoint, "client closed");
    }

    /// Whether the client has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.pipeline.pool().is_closed()
    }

    /// Current pool status for this client's endpoint.
    #[must_use]
    pub fn pool_status(&self) -> PoolStatus {
        self.inner
            .pipeline
            .pool()
            .status(self.inner.pipeline.endpoint())
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    fn base_params(&self, overrides: &Settings) -> QueryParams {
        let mut params = QueryParams::new();
        params.push("database", self.inner.config.database.clone());
        self.inner
            .config
            .settings
            .merged_with(overrides)
            .append_to(&mut params);
        params
    }

    fn base_headers(&self) -> Vec<(String, String)> {
        let config = &self.inner.config;
        let mut headers = vec![
            ("User-Agent".to_string(), config.application.clone()),
            ("X-Colstore-User".to_string(), config.username.clone()),
        ];
        if let Some(password) = &config.password {
            headers.push(("X-Colstore-Key".to_string(), password.clone()));
        }
        headers
    }

    fn descriptor(
        &self,
        method: Method,
        path: &str,
        params: QueryParams,
        headers: Vec<(String, String)>,
        body: Body,
        options: &RequestOptions,
    ) -> RequestDescriptor {
        RequestDescriptor {
            method,
            path: path.to_string(),
            params,
            headers,
            body,
            timeout: options.timeout.unwrap_or(self.inner.config.request_timeout),
            abort: options
                .abort
                .clone()
                .unwrap_or_else(|| self.inner.root.child_token()),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("database", &self.inner.config.database)
            .finish()
    }
}

/// Append `FORMAT <name>` when the statement has no explicit clause.
fn append_default_format(sql: &str, format: &str) -> String {
    if sql.to_ascii_uppercase().contains(" FORMAT ") {
        return sql.to_string();
    }
    let trimmed = sql.trim_end().trim_end_matches(';').trim_end();
    format!("{trimmed} FORMAT {format}")
}

/// Validate a table name (optionally database-qualified) before splicing it
/// into an INSERT statement.
fn validate_table_name(name: &str) -> Result<()> {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static TABLE_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,127}(\.[A-Za-z_][A-Za-z0-9_]{0,127})?$").unwrap()
    });

    if name.is_empty() {
        return Err(Error::Config("table name cannot be empty".to_string()));
    }

    if !TABLE_RE.is_match(name) {
        return Err(Error::Config(format!(
            "invalid table name '{name}': must start with letter/underscore, \
             contain only alphanumerics/_, optionally qualified by a database"
        )));
    }

    Ok(())
}
