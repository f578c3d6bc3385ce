//! # Mcpool Core Library
//!
//! Domain types and boundaries for the Mcpool tool-call engine.
//!
//! ## Modules
//!
//! - `call` - Tool call / result value types and the priority enum
//! - `config` - Pool and orchestrator configuration
//! - `connection` - Pooled connection records and statistics snapshots
//! - `error` - Typed errors for pool and orchestration failures
//! - `transport` - The injected tool transport boundary

pub mod call;
pub mod config;
pub mod connection;
pub mod error;
pub mod transport;

// Re-export commonly used types
pub use call::{ToolCall, ToolPriority, ToolResult};
pub use config::{ExhaustionPolicy, OrchestratorConfig, PoolConfig};
pub use connection::{ConnectionInfo, PoolStats, ServerPoolStats};
pub use error::{Error, Result};
pub use transport::ToolTransport;
