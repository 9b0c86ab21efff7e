//! Tool trait contract for registry-managed capabilities.
//!
//! ```rust
//! use serde_json::json;
//! use wprovider::ToolDefinition;
//! use wtooling::{FunctionTool, Tool};
//!
//! let tool = FunctionTool::new(
//!     ToolDefinition::new("echo", "Echoes input", json!({"type": "object"})),
//!     |args, _ctx| async move { Ok(args) },
//! );
//!
//! assert_eq!(tool.definition().name, "echo");
//! ```

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use wcommon::BoxFuture;
use wprovider::ToolDefinition;

use crate::{ToolError, ToolExecutionContext};

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

/// A callable capability exposed to the model.
///
/// Implementations must be stateless with respect to a single call: the
/// orchestrator may invoke several calls of the same tool concurrently.
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn invoke<'a>(
        &'a self,
        arguments: &'a Value,
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, Result<Value, ToolError>>;
}

type ToolHandler =
    dyn Fn(Value, ToolExecutionContext) -> ToolFuture<'static, Result<Value, ToolError>> + Send + Sync;

pub struct FunctionTool {
    definition: ToolDefinition,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    pub fn new<F, Fut>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(Value, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let handler: Arc<ToolHandler> =
            Arc::new(move |arguments, context| Box::pin(handler(arguments, context)));

        Self {
            definition,
            handler,
        }
    }
}

impl Tool for FunctionTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn invoke<'a>(
        &'a self,
        arguments: &'a Value,
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, Result<Value, ToolError>> {
        (self.handler)(arguments.clone(), context.clone())
    }
}
