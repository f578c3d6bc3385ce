//! Connection Pool Manager - bounded, per-server connection pooling
//!
//! ConnectionPoolManager is responsible for:
//! - Creating connections lazily, up to a per-server cap
//! - Lending idle healthy connections and taking them back with an
//!   observed success/failure outcome
//! - Retiring connections whose consecutive failures reach the
//!   configured threshold
//! - Blocking or failing fast when a server's pool is saturated,
//!   per the configured backpressure policy
//!
//! Connection establishment itself is delegated to the injected
//! `ToolTransport` via its `open` hook.

mod server;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use mcpool_core::{
    ConnectionInfo, Error, ExhaustionPolicy, PoolConfig, PoolStats, Result, ToolTransport,
};
use tracing::{debug, info, warn};

use server::ServerPool;

/// Bounded, per-server pool of reusable connections with health tracking.
pub struct ConnectionPoolManager {
    config: PoolConfig,
    transport: Arc<dyn ToolTransport>,
    /// Server pools, created lazily on first request
    pools: DashMap<String, Arc<ServerPool>>,
    closed: AtomicBool,
}

impl ConnectionPoolManager {
    pub fn new(config: PoolConfig, transport: Arc<dyn ToolTransport>) -> Self {
        Self {
            config,
            transport,
            pools: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of distinct servers this manager has pooled for.
    pub fn known_servers(&self) -> usize {
        self.pools.len()
    }

    fn server_pool(&self, server_name: &str) -> Arc<ServerPool> {
        self.pools
            .entry(server_name.to_string())
            .or_insert_with(|| Arc::new(ServerPool::new()))
            .clone()
    }

    /// Acquire a connection for `server_name`, lending it to the caller.
    ///
    /// Reuses an idle healthy connection when one exists, creates a new
    /// one below the cap, and otherwise waits (or fails fast) per the
    /// configured exhaustion policy.
    pub async fn get_connection(&self, server_name: &str) -> Result<ConnectionInfo> {
        let pool = self.server_pool(server_name);
        let started = Instant::now();

        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(Error::ManagerClosed);
            }

            {
                let mut state = pool.state.lock().await;

                // Re-check under the lock: close_all may have run between
                // the load above and lock acquisition, and a connection
                // lent past it would outlive the cleared pool.
                if self.closed.load(Ordering::Acquire) {
                    return Err(Error::ManagerClosed);
                }

                if let Some(conn) = state.lend() {
                    debug!(
                        server = server_name,
                        connection_id = %conn.connection_id,
                        use_count = conn.use_count,
                        "[ConnectionPool] Reusing pooled connection"
                    );
                    return Ok(conn);
                }

                if state.live() < self.config.max_connections_per_server {
                    // Hold the pool lock across open so concurrent
                    // creators cannot overshoot the cap.
                    self.transport.open(server_name).await.map_err(|e| {
                        Error::ConnectionCreationFailed {
                            server: server_name.to_string(),
                            reason: e.to_string(),
                        }
                    })?;

                    // close_all stores the flag before taking this lock;
                    // if it landed while open was in flight, the new
                    // connection must not be lent.
                    if self.closed.load(Ordering::Acquire) {
                        return Err(Error::ManagerClosed);
                    }

                    let conn = ConnectionInfo::new(server_name);
                    state.connections.push(conn.clone());
                    info!(
                        server = server_name,
                        connection_id = %conn.connection_id,
                        live = state.live(),
                        "[ConnectionPool] Created connection"
                    );
                    return Ok(conn);
                }
            }

            // Saturated: every slot is lent out
            match self.config.on_exhausted {
                ExhaustionPolicy::FailFast => {
                    warn!(server = server_name, "[ConnectionPool] Pool exhausted, failing fast");
                    return Err(Error::PoolExhausted {
                        server: server_name.to_string(),
                        waited: started.elapsed(),
                    });
                }
                ExhaustionPolicy::Block => {
                    let remaining = self
                        .config
                        .acquire_timeout
                        .saturating_sub(started.elapsed());
                    if remaining.is_zero()
                        || tokio::time::timeout(remaining, pool.returned.notified())
                            .await
                            .is_err()
                    {
                        if self.closed.load(Ordering::Acquire) {
                            return Err(Error::ManagerClosed);
                        }
                        warn!(
                            server = server_name,
                            waited = ?started.elapsed(),
                            "[ConnectionPool] Wait budget exhausted"
                        );
                        return Err(Error::PoolExhausted {
                            server: server_name.to_string(),
                            waited: started.elapsed(),
                        });
                    }
                }
            }
        }
    }

    /// Take back a lent connection, recording the outcome of the work
    /// performed over it.
    ///
    /// A failed return counts toward the connection's retirement
    /// threshold; once reached, the connection is retired and its cap
    /// slot freed. Safe to call on every exit path, including after
    /// `close_all`.
    pub async fn return_connection(&self, connection: &ConnectionInfo, success: bool) {
        let Some(pool) = self
            .pools
            .get(&connection.server_name)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return;
        };

        {
            let mut state = pool.state.lock().await;
            let Some(slot) = state
                .connections
                .iter_mut()
                .find(|c| c.connection_id == connection.connection_id)
            else {
                // Already retired, or the manager was closed mid-flight.
                drop(state);
                pool.returned.notify_one();
                return;
            };

            slot.in_use = false;
            slot.last_used = Utc::now();
            if success {
                slot.consecutive_failures = 0;
            } else {
                slot.consecutive_failures += 1;
                if slot.consecutive_failures >= self.config.failure_threshold {
                    slot.is_healthy = false;
                    warn!(
                        server = %connection.server_name,
                        connection_id = %connection.connection_id,
                        failures = slot.consecutive_failures,
                        "[ConnectionPool] Retiring connection after repeated failures"
                    );
                } else {
                    debug!(
                        server = %connection.server_name,
                        connection_id = %connection.connection_id,
                        failures = slot.consecutive_failures,
                        "[ConnectionPool] Recorded connection failure"
                    );
                }
            }

            if !slot.is_healthy {
                state.retire(connection.connection_id);
            }
        }

        pool.returned.notify_one();
    }

    /// Snapshot statistics across all server pools.
    pub async fn get_stats(&self) -> PoolStats {
        // Collect handles first; awaiting while holding a DashMap shard
        // guard can deadlock.
        let pools: Vec<(String, Arc<ServerPool>)> = self
            .pools
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut stats = PoolStats::default();
        for (server_name, pool) in pools {
            let state = pool.state.lock().await;
            stats.absorb(server_name, state.stats());
        }
        stats
    }

    /// Whether `close_all` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release every connection and refuse further acquisition.
    ///
    /// Waiters blocked in `get_connection` are woken and observe
    /// `ManagerClosed`. No connection remains lent afterwards; late
    /// returns from in-flight calls become no-ops.
    pub async fn close_all(&self) {
        self.closed.store(true, Ordering::Release);

        let pools: Vec<(String, Arc<ServerPool>)> = self
            .pools
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        for (server_name, pool) in pools {
            let dropped = {
                let mut state = pool.state.lock().await;
                let dropped = state.live();
                state.connections.clear();
                dropped
            };
            pool.returned.notify_waiters();
            info!(
                server = %server_name,
                dropped,
                "[ConnectionPool] Closed server pool"
            );
        }
    }
}
