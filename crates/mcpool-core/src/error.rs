//! Typed errors for pool and orchestration failures.
//!
//! Per-call failures (`ToolInvocationFailed`, `ToolInvocationTimeout`,
//! and acquisition errors observed while executing a batch) are contained
//! and surfaced as failed `ToolResult`s. Only lifecycle errors reach the
//! caller as `Err`.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No connection became available within the wait budget.
    #[error("connection pool for '{server}' exhausted after waiting {waited:?}")]
    PoolExhausted { server: String, waited: Duration },

    /// The transport failed to open a new connection.
    #[error("failed to open connection to '{server}': {reason}")]
    ConnectionCreationFailed { server: String, reason: String },

    /// The transport or the tool itself reported an error.
    #[error("tool '{tool}' on '{server}' failed: {reason}")]
    ToolInvocationFailed {
        tool: String,
        server: String,
        reason: String,
    },

    /// The invocation did not complete within the per-call timeout.
    #[error("tool '{tool}' on '{server}' timed out after {timeout:?}")]
    ToolInvocationTimeout {
        tool: String,
        server: String,
        timeout: Duration,
    },

    /// Operation attempted after shutdown.
    #[error("connection manager is closed")]
    ManagerClosed,
}
