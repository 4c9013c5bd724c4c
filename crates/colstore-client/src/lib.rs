//! # colstore-client
//!
//! High-level async client for column-store databases that speak an HTTP(S)
//! row-format interface.
//!
//! This is the primary public API surface for the rust-colstore-driver
//! project. It multiplexes many logical operations over a bounded pool of
//! keep-alive connections and streams row data in both directions without
//! ever buffering a full dataset.
//!
//! ## Features
//!
//! - **Bounded connection pool**: per-endpoint ceiling with FIFO fairness
//! - **Streaming both ways**: lazy query results, backpressured inserts
//! - **One deadline per operation**: dispatch through full response drain
//! - **Pluggable row formats**: `JSONEachRow` by default, `TabSeparated`
//!   and caller-supplied codecs via the format traits
//! - **Pluggable query log**: capability trait with a no-op default
//!
//! ## Example
//!
//! ```rust,ignore
//! use colstore_client::{Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(Config::from_dsn(
//!         "http://default@localhost:8123/default",
//!     )?)?;
//!
//!     client.insert("events", &rows).await?;
//!
//!     let mut rows = client
//!         .query("SELECT id, name FROM events ORDER BY id")
//!         .await?
//!         .rows::<Event>();
//!     while let Some(event) = rows.try_next().await? {
//!         println!("{event:?}");
//!     }
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod query;
pub mod settings;

mod pipeline;

// Re-export commonly used types
pub use client::{Client, RequestOptions};
pub use config::Config;
pub use error::{Error, Result};
pub use logger::{LogEntry, LogLevel, NopQueryLog, QueryLog, TracingQueryLog};
pub use query::{QueryResult, RowStream};
pub use settings::{SettingValue, Settings};

pub use colstore_driver_pool::{PoolMetrics, PoolStatus};
pub use colstore_formats::{Format, JsonEachRow, RowDecoder, RowEncoder, TabSeparated};
pub use colstore_transport::{Endpoint, TlsConfig};
