//! MCP Orchestrator - priority-ordered batch dispatch
//!
//! McpOrchestrator accepts a batch of tool calls, partitions it by
//! priority, and dispatches it against the connection pool with bounded
//! fan-out. Dispatch order is strict (HIGH, then NORMAL, then LOW);
//! completions may interleave, and results are reassembled into the
//! input order.
//!
//! A failing call never aborts its batch: every submitted call yields
//! exactly one `ToolResult`, success or failure. Only a closed
//! orchestrator refuses a batch outright.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mcpool_core::{
    Error, OrchestratorConfig, PoolStats, Result, ToolCall, ToolPriority, ToolResult,
    ToolTransport,
};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::pool::ConnectionPoolManager;

/// A batch split into its three priority buckets.
///
/// Explicit fields rather than a map keep the HIGH -> NORMAL -> LOW
/// dispatch order type-checked. Within each bucket the relative input
/// order is preserved.
#[derive(Debug, Clone, Default)]
pub struct PrioritizedCalls {
    pub high: Vec<ToolCall>,
    pub normal: Vec<ToolCall>,
    pub low: Vec<ToolCall>,
}

impl PrioritizedCalls {
    pub fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Orchestrator-level observability snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStats {
    /// Still accepting `execute` batches
    pub accepting: bool,
    /// Distinct servers the pool has connected to
    pub known_servers: usize,
    /// Configured dispatch fan-out
    pub max_concurrency: usize,
    /// Pool-level counters
    pub pool: PoolStats,
}

/// Schedules and executes batches of tool calls against the pool.
pub struct McpOrchestrator {
    pool: Arc<ConnectionPoolManager>,
    transport: Arc<dyn ToolTransport>,
    config: OrchestratorConfig,
    closed: AtomicBool,
}

impl McpOrchestrator {
    pub fn new(
        pool: Arc<ConnectionPoolManager>,
        transport: Arc<dyn ToolTransport>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            pool,
            transport,
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Stable-partition a batch into its priority buckets.
    ///
    /// Pure; exposed separately from `execute` so schedules can be
    /// inspected without dispatching anything.
    pub fn prioritize(calls: &[ToolCall]) -> PrioritizedCalls {
        let mut buckets = PrioritizedCalls::default();
        for call in calls {
            match call.priority {
                ToolPriority::High => buckets.high.push(call.clone()),
                ToolPriority::Normal => buckets.normal.push(call.clone()),
                ToolPriority::Low => buckets.low.push(call.clone()),
            }
        }
        buckets
    }

    /// Execute a batch, returning one result per call in input order.
    ///
    /// Errors only when the orchestrator has been closed; every other
    /// failure is contained in the corresponding `ToolResult`.
    pub async fn execute(&self, calls: Vec<ToolCall>) -> Result<Vec<ToolResult>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ManagerClosed);
        }
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            batch = calls.len(),
            fan_out = self.config.max_concurrency,
            "[Orchestrator] Executing batch"
        );

        // Dispatch order: original input order within each priority tier
        let mut order: Vec<usize> = Vec::with_capacity(calls.len());
        for wanted in [ToolPriority::High, ToolPriority::Normal, ToolPriority::Low] {
            order.extend(
                calls
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.priority == wanted)
                    .map(|(idx, _)| idx),
            );
        }

        // Permits are acquired in dispatch order, so no LOW call is
        // spawned before every HIGH and NORMAL call has been.
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut handles = Vec::with_capacity(order.len());
        for idx in order {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .expect("semaphore closed");
            let pool = Arc::clone(&self.pool);
            let transport = Arc::clone(&self.transport);
            let call = calls[idx].clone();
            let call_timeout = self.config.call_timeout;
            handles.push((
                idx,
                tokio::spawn(async move {
                    let result = dispatch_one(pool, transport, &call, call_timeout).await;
                    drop(permit);
                    result
                }),
            ));
        }

        let mut results: Vec<Option<ToolResult>> = calls.iter().map(|_| None).collect();
        for (idx, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "[Orchestrator] Dispatch task aborted");
                    ToolResult::failed(&calls[idx], format!("dispatch aborted: {e}"), Duration::ZERO)
                }
            };
            results[idx] = Some(result);
        }

        // Every index in the dispatch order was filled exactly once
        Ok(results
            .into_iter()
            .map(|r| r.expect("one result per call"))
            .collect())
    }

    /// Orchestrator-level state plus pool counters, for observability.
    pub async fn get_connection_stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            accepting: !self.closed.load(Ordering::Acquire),
            known_servers: self.pool.known_servers(),
            max_concurrency: self.config.max_concurrency,
            pool: self.pool.get_stats().await,
        }
    }

    /// Stop accepting batches and release every pooled connection.
    pub async fn close_all_connections(&self) {
        self.closed.store(true, Ordering::Release);
        self.pool.close_all().await;
    }
}

/// Run a single call to completion, containing every failure.
///
/// The connection is returned to the pool on every exit path, carrying
/// the observed outcome so the pool can update health state.
async fn dispatch_one(
    pool: Arc<ConnectionPoolManager>,
    transport: Arc<dyn ToolTransport>,
    call: &ToolCall,
    call_timeout: Duration,
) -> ToolResult {
    let started = Instant::now();

    let conn = match pool.get_connection(&call.mcp_server).await {
        Ok(conn) => conn,
        Err(e) => {
            warn!(
                server = %call.mcp_server,
                tool = %call.tool_name,
                error = %e,
                "[Orchestrator] Connection acquisition failed"
            );
            return ToolResult::failed(call, e.to_string(), started.elapsed());
        }
    };

    // On timeout the invoke future is dropped, cancelling the in-flight
    // request where the transport supports it.
    let outcome = tokio::time::timeout(
        call_timeout,
        transport.invoke(&conn, &call.tool_name, &call.arguments),
    )
    .await;

    let result = match outcome {
        Ok(Ok(data)) => ToolResult::ok(call, data, started.elapsed()),
        Ok(Err(e)) => {
            let err = Error::ToolInvocationFailed {
                tool: call.tool_name.clone(),
                server: call.mcp_server.clone(),
                reason: e.to_string(),
            };
            ToolResult::failed(call, err.to_string(), started.elapsed())
        }
        Err(_) => {
            let err = Error::ToolInvocationTimeout {
                tool: call.tool_name.clone(),
                server: call.mcp_server.clone(),
                timeout: call_timeout,
            };
            ToolResult::failed(call, err.to_string(), started.elapsed())
        }
    };

    pool.return_connection(&conn, result.success).await;
    result
}
