//! Connection pool implementation.
//!
//! The pool is partitioned by [`Endpoint`]. Each partition tracks an idle
//! deque, a count of every live slot (idle, in-use, and reserved-for-dial),
//! and a FIFO deque of waiters. All three are updated inside one critical
//! section so counts and membership are never observed inconsistently.
//!
//! A waiter is woken with a [`Grant`]: either a reusable connection or
//! permission to dial a fresh one against an already-reserved slot. Grants
//! are themselves drop-safe: if the waiting future was cancelled before it
//! could claim its grant, the grant re-dispatches itself to the next waiter
//! instead of leaking the slot.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use colstore_codec::HttpConnection;
use colstore_transport::{Dial, Endpoint};

use crate::config::PoolConfig;
use crate::error::PoolError;

/// A connection pool for column-store HTTP endpoints.
///
/// Cheaply cloneable; all clones share the same state.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: PoolConfig,
    dial: Arc<dyn Dial>,

    /// Fast-path closed flag; `Shared::closed` is the source of truth.
    closed: AtomicBool,

    /// Counter for generating connection IDs.
    next_connection_id: AtomicU64,

    /// When the pool was created.
    created_at: Instant,

    shared: Mutex<Shared>,
}

#[derive(Default)]
struct Shared {
    closed: bool,
    endpoints: HashMap<Endpoint, EndpointState>,
    metrics: MetricsInner,
}

#[derive(Default)]
struct EndpointState {
    /// Idle connections: oldest at the front, reuse pops from the back.
    idle: VecDeque<IdleConn>,
    /// Live slots for this endpoint: idle + in-use + reserved-for-dial.
    total: u32,
    /// FIFO waiters; the front waiter is always served first.
    waiters: VecDeque<oneshot::Sender<Grant>>,
}

struct IdleConn {
    conn: HttpConnection,
    idle_since: Instant,
}

/// Internal counters.
#[derive(Debug, Default, Clone)]
struct MetricsInner {
    connections_created: u64,
    connections_closed: u64,
    checkouts: u64,
    reuses: u64,
    evictions: u64,
    waits: u64,
}

enum GrantKind {
    /// A healthy idle connection, handed over directly.
    Conn(HttpConnection),
    /// Permission to dial against a slot already reserved for the receiver.
    Open,
}

/// Drop-safe waiter wakeup payload.
struct Grant {
    kind: Option<GrantKind>,
    endpoint: Endpoint,
    inner: Arc<PoolInner>,
}

impl Grant {
    fn new(inner: Arc<PoolInner>, endpoint: Endpoint, kind: GrantKind) -> Self {
        Self {
            kind: Some(kind),
            endpoint,
            inner,
        }
    }

    /// Consume the grant, leaving nothing for `Drop` to re-dispatch.
    fn claim(mut self) -> GrantKind {
        match self.kind.take() {
            Some(kind) => kind,
            // claim() consumes self and kind is set at construction.
            None => GrantKind::Open,
        }
    }

    /// Take the payload back without triggering re-dispatch.
    fn disarm(&mut self) -> Option<GrantKind> {
        self.kind.take()
    }
}

impl Drop for Grant {
    fn drop(&mut self) {
        // The receiving future was cancelled after the grant was sent. The
        // resource must flow on to the next waiter or back to the pool.
        if let Some(kind) = self.kind.take() {
            match kind {
                GrantKind::Conn(conn) => PoolInner::recycle(&self.inner, &self.endpoint, conn),
                GrantKind::Open => PoolInner::forfeit_slot(&self.inner, &self.endpoint),
            }
        }
    }
}

enum AcquireStep {
    Ready(HttpConnection),
    Dial,
    Wait(oneshot::Receiver<Grant>),
}

impl Pool {
    /// Create a pool over the given dialer.
    pub fn new(config: PoolConfig, dial: Arc<dyn Dial>) -> Result<Self, PoolError> {
        config.validate()?;

        tracing::info!(
            max_per_endpoint = config.max_connections_per_endpoint,
            idle_timeout_ms = config.idle_timeout.as_millis() as u64,
            "connection pool created"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                dial,
                closed: AtomicBool::new(false),
                next_connection_id: AtomicU64::new(1),
                created_at: Instant::now(),
                shared: Mutex::new(Shared::default()),
            }),
        })
    }

    /// Acquire a connection for `endpoint`.
    ///
    /// Returns an idle connection when one is fresh, dials a new one while
    /// the endpoint is under its ceiling, and otherwise suspends until a
    /// connection is released. Waiters are served strictly first-in
    /// first-out per endpoint; acquisitions against different endpoints
    /// never queue behind each other.
    ///
    /// The returned guard must be released exactly once; dropping it without
    /// an explicit [`PooledConn::release`] counts as an unhealthy release.
    pub async fn acquire(&self, endpoint: &Endpoint) -> Result<PooledConn, PoolError> {
        let step = self.inner.begin_acquire(endpoint)?;
        let conn = match step {
            AcquireStep::Ready(conn) => conn,
            AcquireStep::Dial => PoolInner::open_connection(&self.inner, endpoint).await?,
            AcquireStep::Wait(rx) => {
                tracing::trace!(endpoint = %endpoint, "waiting for pool slot");
                let grant = rx.await.map_err(|_| PoolError::Closed)?;
                match grant.claim() {
                    GrantKind::Conn(conn) => conn,
                    GrantKind::Open => PoolInner::open_connection(&self.inner, endpoint).await?,
                }
            }
        };
        self.inner.shared.lock().metrics.checkouts += 1;
        tracing::trace!(endpoint = %endpoint, connection_id = conn.id(), "connection acquired");
        Ok(PooledConn {
            endpoint: conn.endpoint().clone(),
            conn: Some(conn),
            inner: Arc::clone(&self.inner),
        })
    }

    /// Close the pool.
    ///
    /// Idle connections are dropped immediately, queued waiters fail with
    /// [`PoolError::Closed`], and in-use connections are closed as their
    /// holders release them. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let (idle, waiters) = {
            let mut shared = self.inner.shared.lock();
            shared.closed = true;
            let mut idle = Vec::new();
            let mut waiters = Vec::new();
            for state in shared.endpoints.values_mut() {
                state.total -= state.idle.len() as u32;
                idle.extend(state.idle.drain(..));
                waiters.extend(state.waiters.drain(..));
            }
            shared.metrics.connections_closed += idle.len() as u64;
            (idle, waiters)
        };
        tracing::info!(
            closed_idle = idle.len(),
            failed_waiters = waiters.len(),
            "connection pool closed"
        );
        // Dropping the senders wakes every waiter with a closed-channel
        // error; dropping the idle entries closes their sockets.
        drop(idle);
        drop(waiters);
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Get the current status of one endpoint's partition.
    #[must_use]
    pub fn status(&self, endpoint: &Endpoint) -> PoolStatus {
        let shared = self.inner.shared.lock();
        let (idle, total) = shared
            .endpoints
            .get(endpoint)
            .map(|s| (s.idle.len() as u32, s.total))
            .unwrap_or((0, 0));
        PoolStatus {
            idle,
            in_use: total - idle,
            total,
            max: self.inner.config.max_connections_per_endpoint,
        }
    }

    /// Get pool metrics.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let metrics = self.inner.shared.lock().metrics.clone();
        PoolMetrics {
            connections_created: metrics.connections_created,
            connections_closed: metrics.connections_closed,
            checkouts: metrics.checkouts,
            reuses: metrics.reuses,
            evictions: metrics.evictions,
            waits: metrics.waits,
            uptime: self.inner.created_at.elapsed(),
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("max_per_endpoint", &self.inner.config.max_connections_per_endpoint)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl PoolInner {
    /// First, lock-held phase of an acquire.
    fn begin_acquire(&self, endpoint: &Endpoint) -> Result<AcquireStep, PoolError> {
        let mut stale = Vec::new();
        let mut shared = self.shared.lock();
        if shared.closed {
            return Err(PoolError::Closed);
        }
        let idle_timeout = self.config.idle_timeout;
        let max = self.config.max_connections_per_endpoint;

        let step = {
            let state = shared.endpoints.entry(endpoint.clone()).or_default();

            // Lazy eviction: oldest idle entries sit at the front.
            while let Some(front) = state.idle.front() {
                if front.idle_since.elapsed() >= idle_timeout {
                    if let Some(entry) = state.idle.pop_front() {
                        state.total -= 1;
                        stale.push(entry);
                    }
                } else {
                    break;
                }
            }

            if let Some(entry) = state.idle.pop_back() {
                AcquireStep::Ready(entry.conn)
            } else if state.total < max {
                // Reserve the slot before releasing the lock; a failed or
                // cancelled dial forfeits it.
                state.total += 1;
                AcquireStep::Dial
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                AcquireStep::Wait(rx)
            }
        };

        shared.metrics.evictions += stale.len() as u64;
        shared.metrics.connections_closed += stale.len() as u64;
        match &step {
            AcquireStep::Ready(_) => shared.metrics.reuses += 1,
            AcquireStep::Wait(_) => shared.metrics.waits += 1,
            AcquireStep::Dial => {}
        }
        drop(shared);

        if !stale.is_empty() {
            tracing::debug!(endpoint = %endpoint, count = stale.len(), "evicted stale idle connections");
        }
        Ok(step)
    }

    /// Dial against an already-reserved slot.
    async fn open_connection(
        inner: &Arc<PoolInner>,
        endpoint: &Endpoint,
    ) -> Result<HttpConnection, PoolError> {
        let mut reservation = SlotReservation {
            inner: Some(Arc::clone(inner)),
            endpoint: endpoint.clone(),
        };
        let socket = inner.dial.dial(endpoint).await?;
        // The slot is now owned by the connection.
        reservation.inner = None;

        let id = inner.next_connection_id.fetch_add(1, Ordering::Relaxed);
        inner.shared.lock().metrics.connections_created += 1;
        tracing::debug!(endpoint = %endpoint, connection_id = id, "connection opened");
        Ok(HttpConnection::new(id, endpoint.clone(), socket))
    }

    /// Return `conn` to the pool after a successful exchange.
    ///
    /// Hands it to the front waiter when one is pending, otherwise parks it
    /// idle. Never called with the shared lock held.
    fn recycle(inner: &Arc<PoolInner>, endpoint: &Endpoint, conn: HttpConnection) {
        let mut conn = conn;
        loop {
            let waiter = {
                let mut shared = inner.shared.lock();
                if shared.closed {
                    if let Some(state) = shared.endpoints.get_mut(endpoint) {
                        state.total -= 1;
                    }
                    shared.metrics.connections_closed += 1;
                    return;
                }
                let Some(state) = shared.endpoints.get_mut(endpoint) else {
                    return;
                };
                match state.waiters.pop_front() {
                    Some(tx) => tx,
                    None => {
                        state.idle.push_back(IdleConn {
                            conn,
                            idle_since: Instant::now(),
                        });
                        return;
                    }
                }
            };
            let grant = Grant::new(Arc::clone(inner), endpoint.clone(), GrantKind::Conn(conn));
            match waiter.send(grant) {
                Ok(()) => return,
                Err(mut grant) => {
                    // The waiter gave up before the grant arrived; recover
                    // the connection and try the next waiter.
                    match grant.disarm() {
                        Some(GrantKind::Conn(recovered)) => conn = recovered,
                        _ => return,
                    }
                }
            }
        }
    }

    /// Free a slot whose connection is gone (unhealthy release, failed dial,
    /// cancelled open). The freed capacity is offered to the front waiter as
    /// permission to dial; with no waiters the count simply drops.
    fn forfeit_slot(inner: &Arc<PoolInner>, endpoint: &Endpoint) {
        loop {
            let waiter = {
                let mut shared = inner.shared.lock();
                let closed = shared.closed;
                let Some(state) = shared.endpoints.get_mut(endpoint) else {
                    return;
                };
                if closed {
                    state.total -= 1;
                    return;
                }
                match state.waiters.pop_front() {
                    // Slot transfers to the waiter: total stays put.
                    Some(tx) => tx,
                    None => {
                        state.total -= 1;
                        return;
                    }
                }
            };
            let grant = Grant::new(Arc::clone(inner), endpoint.clone(), GrantKind::Open);
            match waiter.send(grant) {
                Ok(()) => return,
                Err(mut grant) => {
                    grant.disarm();
                }
            }
        }
    }

    /// Single release point for every guard exit path.
    fn release(inner: &Arc<PoolInner>, endpoint: &Endpoint, conn: HttpConnection, healthy: bool) {
        let expired = inner
            .config
            .max_lifetime
            .is_some_and(|lifetime| conn.created_at().elapsed() >= lifetime);
        let reusable = healthy && !expired && conn.is_idle();
        tracing::trace!(
            endpoint = %endpoint,
            connection_id = conn.id(),
            healthy,
            reusable,
            "releasing connection"
        );
        if reusable {
            Self::recycle(inner, endpoint, conn);
        } else {
            drop(conn);
            inner.shared.lock().metrics.connections_closed += 1;
            Self::forfeit_slot(inner, endpoint);
        }
    }
}

/// RAII slot reservation for an in-flight dial.
struct SlotReservation {
    inner: Option<Arc<PoolInner>>,
    endpoint: Endpoint,
}

impl Drop for SlotReservation {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            PoolInner::forfeit_slot(&inner, &self.endpoint);
        }
    }
}

/// Status information about one endpoint's partition.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Number of idle connections available.
    pub idle: u32,
    /// Number of connections currently held by requests.
    pub in_use: u32,
    /// Total live slots (idle + in-use + reserved for dialing).
    pub total: u32,
    /// Per-endpoint ceiling.
    pub max: u32,
}

impl PoolStatus {
    /// Calculate the utilization percentage.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        f64::from(self.in_use) / f64::from(self.max) * 100.0
    }

    /// Check if the partition is at capacity.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.total >= self.max
    }
}

/// Metrics collected from the pool.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Total connections opened since pool start.
    pub connections_created: u64,
    /// Total connections closed since pool start.
    pub connections_closed: u64,
    /// Successful acquisitions.
    pub checkouts: u64,
    /// Acquisitions satisfied from the idle deque.
    pub reuses: u64,
    /// Idle connections closed past the freshness horizon.
    pub evictions: u64,
    /// Acquisitions that had to queue.
    pub waits: u64,
    /// Time since pool creation.
    pub uptime: std::time::Duration,
}

impl PoolMetrics {
    /// Fraction of checkouts served without dialing (0.0 to 1.0).
    #[must_use]
    pub fn reuse_rate(&self) -> f64 {
        if self.checkouts == 0 {
            return 0.0;
        }
        self.reuses as f64 / self.checkouts as f64
    }
}

/// A connection acquired from the pool.
///
/// Release it explicitly with [`release`](Self::release) once the exchange
/// outcome is known. Dropping the guard without releasing (cancellation,
/// timeout unwinding, panic) counts as an unhealthy release: the socket is
/// closed and the slot freed, so no exit path can leak capacity.
pub struct PooledConn {
    conn: Option<HttpConnection>,
    endpoint: Endpoint,
    inner: Arc<PoolInner>,
}

impl PooledConn {
    /// Release the connection back to the pool.
    ///
    /// `healthy` reports the exchange outcome: `true` returns the connection
    /// for reuse (if it is still within its freshness horizon and fully
    /// drained), `false` closes it and frees the slot.
    pub fn release(mut self, healthy: bool) {
        if let Some(conn) = self.conn.take() {
            PoolInner::release(&self.inner, &self.endpoint, conn, healthy);
        }
    }

    /// The endpoint this connection belongs to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl std::ops::Deref for PooledConn {
    type Target = HttpConnection;

    fn deref(&self) -> &Self::Target {
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("connection already released"),
        }
    }
}

impl std::ops::DerefMut for PooledConn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("connection already released"),
        }
    }
}

impl Drop for PooledConn {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            // Dropped without an explicit release: treat as unhealthy.
            PoolInner::release(&self.inner, &self.endpoint, conn, false);
        }
    }
}

impl std::fmt::Debug for PooledConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConn")
            .field("endpoint", &self.endpoint)
            .field("connection", &self.conn)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use colstore_transport::{BoxedSocket, TransportError};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time::timeout;

    /// Dialer over in-memory duplex pipes; keeps server halves alive.
    struct MockDial {
        dials: AtomicUsize,
        server_halves: Mutex<Vec<tokio::io::DuplexStream>>,
        fail: AtomicBool,
    }

    impl MockDial {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                dials: AtomicUsize::new(0),
                server_halves: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
            })
        }

        fn dial_count(&self) -> usize {
            self.dials.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Dial for MockDial {
        async fn dial(&self, _endpoint: &Endpoint) -> Result<BoxedSocket, TransportError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(TransportError::Connect(std::io::Error::other("refused")));
            }
            self.dials.fetch_add(1, Ordering::SeqCst);
            let (client, server) = tokio::io::duplex(4096);
            self.server_halves.lock().push(server);
            Ok(Box::new(client))
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint::new("localhost", 8123, false, "default")
    }

    fn pool_with(max: u32, idle_timeout: Duration) -> (Pool, Arc<MockDial>) {
        let dial = MockDial::new();
        let config = PoolConfig::new()
            .max_connections_per_endpoint(max)
            .idle_timeout(idle_timeout);
        let pool = Pool::new(config, dial.clone()).unwrap();
        (pool, dial)
    }

    #[tokio::test]
    async fn test_reuse_idle_connection() {
        let (pool, dial) = pool_with(4, Duration::from_secs(60));
        let ep = endpoint();

        let conn = pool.acquire(&ep).await.unwrap();
        let id = conn.id();
        conn.release(true);

        let conn = pool.acquire(&ep).await.unwrap();
        assert_eq!(conn.id(), id);
        assert_eq!(dial.dial_count(), 1);
        assert_eq!(pool.metrics().reuses, 1);
    }

    #[tokio::test]
    async fn test_ceiling_is_enforced() {
        let (pool, dial) = pool_with(2, Duration::from_secs(60));
        let ep = endpoint();

        let a = pool.acquire(&ep).await.unwrap();
        let b = pool.acquire(&ep).await.unwrap();
        assert_eq!(pool.status(&ep).in_use, 2);

        // Third acquire must suspend.
        let third = pool.acquire(&ep);
        tokio::pin!(third);
        assert!(
            timeout(Duration::from_millis(50), third.as_mut())
                .await
                .is_err()
        );

        a.release(true);
        let c = timeout(Duration::from_millis(200), third).await.unwrap().unwrap();
        assert_eq!(dial.dial_count(), 2);
        b.release(true);
        c.release(true);
        assert_eq!(pool.status(&ep).in_use, 0);
        assert_eq!(pool.status(&ep).total, 2);
    }

    #[tokio::test]
    async fn test_waiters_served_fifo() {
        let (pool, _dial) = pool_with(1, Duration::from_secs(60));
        let ep = endpoint();

        let holder = pool.acquire(&ep).await.unwrap();

        let (order_tx, mut order_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut tasks = Vec::new();
        for i in 0..3u32 {
            let pool = pool.clone();
            let ep = ep.clone();
            let order_tx = order_tx.clone();
            tasks.push(tokio::spawn(async move {
                let conn = pool.acquire(&ep).await.unwrap();
                order_tx.send(i).unwrap();
                conn.release(true);
            }));
            // Deterministic registration order.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        holder.release(true);
        for expected in 0..3u32 {
            let got = timeout(Duration::from_secs(1), order_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got, expected);
        }
        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_unhealthy_release_frees_slot_for_dial() {
        let (pool, dial) = pool_with(1, Duration::from_secs(60));
        let ep = endpoint();

        let holder = pool.acquire(&ep).await.unwrap();
        let waiter = {
            let pool = pool.clone();
            let ep = ep.clone();
            tokio::spawn(async move { pool.acquire(&ep).await.unwrap().release(true) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        holder.release(false);
        timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        // The waiter could not reuse the poisoned socket; it dialed fresh.
        assert_eq!(dial.dial_count(), 2);
        assert_eq!(pool.status(&ep).total, 1);
    }

    #[tokio::test]
    async fn test_dropped_guard_counts_as_release() {
        let (pool, _dial) = pool_with(1, Duration::from_secs(60));
        let ep = endpoint();

        let conn = pool.acquire(&ep).await.unwrap();
        drop(conn);
        assert_eq!(pool.status(&ep).total, 0);

        // The slot is usable again.
        let conn = pool.acquire(&ep).await.unwrap();
        conn.release(true);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_steal_grant() {
        let (pool, _dial) = pool_with(1, Duration::from_secs(60));
        let ep = endpoint();

        let holder = pool.acquire(&ep).await.unwrap();

        // This waiter times out and abandons the queue.
        let abandoned = timeout(Duration::from_millis(30), pool.acquire(&ep)).await;
        assert!(abandoned.is_err());

        holder.release(true);
        // The grant fell through to the idle deque, not into the void.
        assert_eq!(pool.status(&ep).idle, 1);
        let conn = pool.acquire(&ep).await.unwrap();
        conn.release(true);
    }

    #[tokio::test]
    async fn test_stale_idle_evicted() {
        let (pool, dial) = pool_with(4, Duration::from_millis(20));
        let ep = endpoint();

        let conn = pool.acquire(&ep).await.unwrap();
        conn.release(true);
        assert_eq!(pool.status(&ep).idle, 1);

        tokio::time::sleep(Duration::from_millis(40)).await;
        let conn = pool.acquire(&ep).await.unwrap();
        conn.release(true);
        assert_eq!(dial.dial_count(), 2);
        assert_eq!(pool.metrics().evictions, 1);
    }

    #[tokio::test]
    async fn test_failed_dial_wakes_next_waiter() {
        let (pool, dial) = pool_with(1, Duration::from_secs(60));
        let ep = endpoint();

        let holder = pool.acquire(&ep).await.unwrap();
        let waiter = {
            let pool = pool.clone();
            let ep = ep.clone();
            tokio::spawn(async move { pool.acquire(&ep).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The unhealthy release grants the waiter permission to dial, but
        // the dial fails; the error must surface, not hang.
        dial.fail.store(true, Ordering::SeqCst);
        holder.release(false);
        let result = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(matches!(result, Err(PoolError::Transport(_))));
        assert_eq!(pool.status(&ep).total, 0);
    }

    #[tokio::test]
    async fn test_close_fails_waiters_and_new_acquires() {
        let (pool, _dial) = pool_with(1, Duration::from_secs(60));
        let ep = endpoint();

        let holder = pool.acquire(&ep).await.unwrap();
        let waiter = {
            let pool = pool.clone();
            let ep = ep.clone();
            tokio::spawn(async move { pool.acquire(&ep).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        pool.close();
        let result = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(matches!(result, Err(PoolError::Closed)));
        assert!(matches!(
            pool.acquire(&ep).await,
            Err(PoolError::Closed)
        ));

        // In-use connections drain as they are released.
        holder.release(true);
        assert_eq!(pool.status(&ep).total, 0);
    }

    #[tokio::test]
    async fn test_endpoints_do_not_contend() {
        let (pool, _dial) = pool_with(1, Duration::from_secs(60));
        let ep_a = endpoint();
        let ep_b = Endpoint::new("localhost", 8123, false, "other");

        let _a = pool.acquire(&ep_a).await.unwrap();
        // Same ceiling, different partition: no queueing.
        let b = timeout(Duration::from_millis(100), pool.acquire(&ep_b))
            .await
            .unwrap()
            .unwrap();
        b.release(true);
    }
}
