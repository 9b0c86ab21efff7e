//! The tools a runtime advertises to the model and resolves calls against.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use wcommon::Registry;
use wprovider::{ToolCallPart, ToolDefinition};

use crate::{FunctionTool, Tool, ToolError, ToolExecutionContext};

/// Tools keyed by definition name.
///
/// Definitions are advertised in first-registration order. Registering a
/// name again swaps the implementation but keeps its advertised slot, so a
/// conversation never sees its tool list reorder mid-run.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Registry<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when an earlier tool with the same name was replaced.
    pub fn register<T>(&mut self, tool: T) -> bool
    where
        T: Tool + 'static,
    {
        let name = tool.definition().name;
        self.tools.insert(name, Arc::new(tool)).is_some()
    }

    pub fn register_fn<F, Fut>(&mut self, definition: ToolDefinition, handler: F) -> bool
    where
        F: Fn(Value, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        self.register(FunctionTool::new(definition, handler))
    }

    pub fn register_sync_fn<F>(&mut self, definition: ToolDefinition, handler: F) -> bool
    where
        F: Fn(Value, ToolExecutionContext) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.register_fn(definition, move |arguments, context| {
            let output = handler(arguments, context);
            async move { output }
        })
    }

    /// The tool a model call names, or a `not_found` error tagged with the call.
    pub fn resolve(&self, call: &ToolCallPart) -> Result<Arc<dyn Tool>, ToolError> {
        self.tools.get(call.name.as_str()).cloned().ok_or_else(|| {
            ToolError::not_found(format!("tool '{}' is not registered", call.name))
                .with_tool_name(call.name.clone())
                .with_tool_call_id(call.id.clone())
        })
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
