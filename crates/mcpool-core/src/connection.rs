//! Pooled connection records and statistics snapshots.
//!
//! `ConnectionInfo` is the pool's book-keeping record for one lightweight
//! client connection. Authoritative copies live inside the
//! `ConnectionPoolManager`; everything handed out is a snapshot and is
//! only ever mutated through lend/return operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Book-keeping record for a single pooled connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Unique id, generated at creation
    pub connection_id: Uuid,
    /// Server this connection belongs to; never shared across servers
    pub server_name: String,
    /// When the connection was established
    pub created_at: DateTime<Utc>,
    /// Last lend or return
    pub last_used: DateTime<Utc>,
    /// Currently lent out to a caller
    pub in_use: bool,
    /// Unhealthy connections are never re-lent
    pub is_healthy: bool,
    /// Number of times the connection has been lent
    pub use_count: u64,
    /// Failed returns since the last successful one; drives retirement
    pub consecutive_failures: u32,
}

impl ConnectionInfo {
    /// Create a fresh connection record, lent out to its creator.
    pub fn new(server_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            connection_id: Uuid::new_v4(),
            server_name: server_name.into(),
            created_at: now,
            last_used: now,
            in_use: true,
            is_healthy: true,
            use_count: 1,
            consecutive_failures: 0,
        }
    }

    /// Idle and still usable.
    pub fn is_available(&self) -> bool {
        !self.in_use && self.is_healthy
    }
}

/// Per-server slice of a [`PoolStats`] snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPoolStats {
    pub total_connections: usize,
    pub active_connections: usize,
    pub idle_connections: usize,
    /// Connections retired from this pool since creation
    pub unhealthy_retired: usize,
}

/// Aggregate pool statistics, recomputed on demand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_connections: usize,
    pub active_connections: usize,
    pub idle_connections: usize,
    pub unhealthy_retired: usize,
    /// Breakdown by server name
    pub servers: HashMap<String, ServerPoolStats>,
}

impl PoolStats {
    /// Fold a per-server slice into the aggregate.
    pub fn absorb(&mut self, server_name: impl Into<String>, server: ServerPoolStats) {
        self.total_connections += server.total_connections;
        self.active_connections += server.active_connections;
        self.idle_connections += server.idle_connections;
        self.unhealthy_retired += server.unhealthy_retired;
        self.servers.insert(server_name.into(), server);
    }
}
