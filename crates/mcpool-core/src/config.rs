//! Pool and orchestrator configuration.
//!
//! Both structs deserialize from the host application's config file with
//! every field defaulted, and carry `with_*` builders for programmatic
//! construction.

use std::time::Duration;

use serde::Deserialize;

/// Default cap on live connections per server.
const DEFAULT_MAX_CONNECTIONS_PER_SERVER: usize = 10;

/// Default wait budget for a saturated pool.
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default consecutive failed returns before a connection is retired.
const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Default concurrent dispatch fan-out.
const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Default per-invocation timeout.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// What `get_connection` does when a server's pool is saturated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Wait up to `acquire_timeout` for a connection to be returned
    #[default]
    Block,
    /// Fail immediately with `PoolExhausted`
    FailFast,
}

/// Configuration for the connection pool manager.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Cap on live connections per server
    pub max_connections_per_server: usize,
    /// Wait budget when the pool is saturated and policy is `Block`
    pub acquire_timeout: Duration,
    /// Backpressure behavior at the cap
    pub on_exhausted: ExhaustionPolicy,
    /// Consecutive failed returns before a connection is retired
    pub failure_threshold: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections_per_server: DEFAULT_MAX_CONNECTIONS_PER_SERVER,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            on_exhausted: ExhaustionPolicy::Block,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

impl PoolConfig {
    pub fn with_max_connections_per_server(mut self, max: usize) -> Self {
        self.max_connections_per_server = max;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_exhaustion_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.on_exhausted = policy;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }
}

/// Configuration for the tool-call orchestrator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Concurrent dispatch fan-out across a batch
    pub max_concurrency: usize,
    /// Per tool invocation timeout
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}
