//! Per-server pool state.
//!
//! Each backend server gets exactly one `ServerPool`, created lazily on
//! first request. All mutations of a server's connection list go through
//! its own mutex, so traffic to different servers never contends.

use chrono::Utc;
use mcpool_core::{ConnectionInfo, ServerPoolStats};
use tokio::sync::{Mutex, Notify};

/// One server's pool: its connection records plus a wakeup channel for
/// callers blocked on a saturated pool.
pub(crate) struct ServerPool {
    pub(crate) state: Mutex<ServerPoolState>,
    /// Signalled once per returned or dropped connection, and broadcast
    /// on close
    pub(crate) returned: Notify,
}

impl ServerPool {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ServerPoolState::default()),
            returned: Notify::new(),
        }
    }
}

/// Mutable contents of a [`ServerPool`], guarded by its mutex.
#[derive(Default)]
pub(crate) struct ServerPoolState {
    /// Live connections, lent and idle alike
    pub(crate) connections: Vec<ConnectionInfo>,
    /// Connections retired from this pool since creation
    pub(crate) retired: usize,
}

impl ServerPoolState {
    /// Lend the most recently used idle healthy connection, if any.
    pub(crate) fn lend(&mut self) -> Option<ConnectionInfo> {
        let slot = self
            .connections
            .iter_mut()
            .filter(|c| c.is_available())
            .max_by_key(|c| c.last_used)?;
        slot.in_use = true;
        slot.use_count += 1;
        slot.last_used = Utc::now();
        Some(slot.clone())
    }

    /// Number of live connections counting toward the cap.
    pub(crate) fn live(&self) -> usize {
        self.connections.len()
    }

    /// Remove a connection from the pool, freeing its cap slot.
    pub(crate) fn retire(&mut self, connection_id: uuid::Uuid) {
        let before = self.connections.len();
        self.connections.retain(|c| c.connection_id != connection_id);
        self.retired += before - self.connections.len();
    }

    /// Snapshot this pool's counters.
    pub(crate) fn stats(&self) -> ServerPoolStats {
        let active = self.connections.iter().filter(|c| c.in_use).count();
        ServerPoolStats {
            total_connections: self.connections.len(),
            active_connections: active,
            idle_connections: self.connections.len() - active,
            unhealthy_retired: self.retired,
        }
    }
}
