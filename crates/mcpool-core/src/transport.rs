//! The injected tool transport boundary.
//!
//! The engine never speaks the MCP wire protocol itself. The host
//! application supplies a [`ToolTransport`] implementation (stdio child
//! process, streamable HTTP, or an in-memory fake in tests) and the pool
//! and orchestrator drive it through this trait.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::connection::ConnectionInfo;

/// Transport capability the engine is handed at construction.
///
/// `invoke` is the per-call dispatch path; `open` is called by the pool
/// once per connection it creates, letting transports that hold real
/// sessions establish them eagerly. Transports with no per-connection
/// setup keep the default no-op.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Establish whatever backing state a new connection needs.
    async fn open(&self, _server_name: &str) -> Result<()> {
        Ok(())
    }

    /// Invoke `tool_name` with `arguments` over `connection`.
    async fn invoke(
        &self,
        connection: &ConnectionInfo,
        tool_name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value>;
}
