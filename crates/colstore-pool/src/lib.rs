//! # colstore-driver-pool
//!
//! Purpose-built connection pool for the column-store driver's keep-alive
//! HTTP connections.
//!
//! Unlike generic connection pools, this implementation understands the
//! driver's exchange lifecycle: a connection is only reusable once its
//! response has been fully drained, and the releasing request reports whether
//! the socket is still healthy.
//!
//! ## Features
//!
//! - Per-endpoint partitioning with a configurable concurrency ceiling
//! - Strict first-in-first-out waiter fairness per endpoint
//! - Healthy/unhealthy release classification
//! - Idle freshness horizon with lazy eviction
//! - Exactly-once release on every exit path via an RAII guard
//! - Pool status and counters for observability
//!
//! ## Example
//!
//! ```rust,ignore
//! use colstore_driver_pool::{Pool, PoolConfig};
//! use std::time::Duration;
//!
//! let config = PoolConfig::new()
//!     .max_connections_per_endpoint(8)
//!     .idle_timeout(Duration::from_millis(2500));
//!
//! let pool = Pool::new(config, dialer)?;
//!
//! let conn = pool.acquire(&endpoint).await?;
//! // Drive a request/response exchange...
//! conn.release(true);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod pool;

// Configuration
pub use config::PoolConfig;

// Error types
pub use error::PoolError;

// Pool types
pub use pool::{Pool, PoolMetrics, PoolStatus, PooledConn};
