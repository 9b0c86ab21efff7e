//! Capability layer for registering and executing tools.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use wprovider::ToolDefinition;
//! use wtooling::{DefaultToolRuntime, ToolBatchExecutor, ToolRegistry, ToolRuntime};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register_sync_fn(
//!     ToolDefinition::new("now", "Current time", json!({"type": "object"})),
//!     |_args, _ctx| Ok(json!("12:00")),
//! );
//!
//! let runtime = Arc::new(DefaultToolRuntime::new(Arc::new(registry)));
//! assert_eq!(runtime.definitions()[0].name, "now");
//!
//! let _executor = ToolBatchExecutor::new(runtime).with_max_concurrency(Some(4));
//! ```

mod args;
mod batch;
mod error;
mod hooks;
mod registry;
mod runtime;
mod tool;
mod types;

pub mod prelude {
    pub use crate::{
        DefaultToolRuntime, FunctionTool, Tool, ToolBatchExecutor, ToolError, ToolErrorKind,
        ToolExecutionContext, ToolExecutionPolicy, ToolExecutionResult, ToolFuture,
        ToolInvocation, ToolOutcome, ToolRegistry, ToolRuntime, ToolRuntimeHooks,
    };
}

pub use args::{
    normalize_arguments, optional_string, parse_json_object, parse_json_value, required_i64,
    required_object, required_string,
};
pub use batch::{ToolBatchExecutor, extract_tool_calls, tool_result_message};
pub use error::{ToolError, ToolErrorKind};
pub use hooks::{NoopToolRuntimeHooks, ToolInvocation, ToolOutcome, ToolRuntimeHooks};
pub use registry::ToolRegistry;
pub use runtime::{DefaultToolRuntime, ToolExecutionPolicy, ToolRuntime};
pub use tool::{FunctionTool, Tool, ToolFuture};
pub use types::{BatchPosition, ToolExecutionContext, ToolExecutionResult};
