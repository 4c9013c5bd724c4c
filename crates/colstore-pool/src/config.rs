//! Pool configuration.

use std::time::Duration;

use crate::error::PoolError;

/// Configuration for the connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Concurrency ceiling per endpoint: idle plus in-use connections never
    /// exceed this.
    pub max_connections_per_endpoint: u32,

    /// Freshness horizon for idle connections.
    ///
    /// A connection idle longer than this is closed instead of reused. Kept
    /// short so a server-side keep-alive reaper rarely closes a socket the
    /// pool still considers live.
    pub idle_timeout: Duration,

    /// Optional ceiling on total connection age, checked on release.
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections_per_endpoint: 10,
            idle_timeout: Duration::from_millis(2500),
            max_lifetime: None,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-endpoint concurrency ceiling.
    #[must_use]
    pub fn max_connections_per_endpoint(mut self, max: u32) -> Self {
        self.max_connections_per_endpoint = max;
        self
    }

    /// Set the idle freshness horizon.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum connection lifetime.
    #[must_use]
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = Some(lifetime);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_connections_per_endpoint == 0 {
            return Err(PoolError::Config(
                "max_connections_per_endpoint must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
