//! Tool call and result value types.
//!
//! A [`ToolCall`] names a tool on a backend server together with its
//! arguments and a scheduling priority. The engine produces exactly one
//! [`ToolResult`] per submitted call, success or failure.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scheduling priority for a tool call.
///
/// Ordered so that `High > Normal > Low`; the orchestrator dispatches
/// whole priority buckets in descending order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolPriority {
    /// Dispatched last
    Low,
    /// Default priority
    #[default]
    Normal,
    /// Dispatched first
    High,
}

/// A single tool invocation request.
///
/// Immutable once constructed; callers build one per invocation and
/// submit batches of them to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool to invoke on the backend server
    pub tool_name: String,
    /// Target server key
    pub mcp_server: String,
    /// Tool arguments, passed through to the transport untouched
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Scheduling priority
    #[serde(default)]
    pub priority: ToolPriority,
}

impl ToolCall {
    /// Create a call with empty arguments and normal priority.
    pub fn new(mcp_server: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            mcp_server: mcp_server.into(),
            arguments: Map::new(),
            priority: ToolPriority::Normal,
        }
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Set a single argument, keeping any already present.
    pub fn with_argument(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: ToolPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// Outcome of one dispatched tool call.
///
/// `data` is present iff `success` is true; `error_message` iff false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was invoked
    pub tool_name: String,
    /// Server the call was dispatched to
    pub mcp_server: String,
    /// Whether the invocation completed successfully
    pub success: bool,
    /// Payload returned by the tool on success
    pub data: Option<Value>,
    /// Human-readable failure description
    pub error_message: Option<String>,
    /// Wall-clock time from scheduling to completion, including
    /// connection acquisition
    pub execution_time: Duration,
}

impl ToolResult {
    /// Build a successful result for `call`.
    pub fn ok(call: &ToolCall, data: Value, execution_time: Duration) -> Self {
        Self {
            tool_name: call.tool_name.clone(),
            mcp_server: call.mcp_server.clone(),
            success: true,
            data: Some(data),
            error_message: None,
            execution_time,
        }
    }

    /// Build a failed result for `call`.
    pub fn failed(call: &ToolCall, error: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            tool_name: call.tool_name.clone(),
            mcp_server: call.mcp_server.clone(),
            success: false,
            data: None,
            error_message: Some(error.into()),
            execution_time,
        }
    }
}
