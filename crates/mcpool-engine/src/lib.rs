//! # Mcpool Engine
//!
//! Connection pooling and tool-call orchestration over an injected
//! transport:
//!
//! - **ConnectionPoolManager**: bounded, per-server pooling of reusable
//!   connections with health-threshold retirement
//! - **McpOrchestrator**: priority-ordered batch dispatch with bounded
//!   fan-out, producing one result per submitted call
//!
//! The host application constructs both explicitly and owns them; there
//! are no process-wide singletons.

pub mod orchestrator;
pub mod pool;

pub use orchestrator::{McpOrchestrator, OrchestratorStats, PrioritizedCalls};
pub use pool::ConnectionPoolManager;
