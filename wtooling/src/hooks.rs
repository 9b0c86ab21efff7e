//! Per-call lifecycle hooks for tool execution.
//!
//! Each call is reported as a [`ToolInvocation`]: the model's request plus the
//! run, iteration and batch slot it was executed in.
//!
//! ```rust
//! use serde_json::json;
//! use wprovider::ToolCallPart;
//! use wtooling::{ToolExecutionContext, ToolInvocation};
//!
//! let call = ToolCallPart::new("c2", "lookup", json!({}));
//! let context = ToolExecutionContext::new("session")
//!     .with_run_id("run-7")
//!     .with_iteration(3)
//!     .with_batch_position(1, 4);
//!
//! let invocation = ToolInvocation::new(&call, &context);
//! assert_eq!(invocation.run_id().map(|id| id.as_str()), Some("run-7"));
//! assert_eq!(invocation.iteration(), 3);
//! assert_eq!(invocation.position().to_string(), "2/4");
//! ```

use std::time::Duration;

use wcommon::RunId;
use wprovider::ToolCallPart;

use crate::{BatchPosition, ToolError, ToolExecutionContext, ToolExecutionResult};

/// One tool call as seen by hooks.
#[derive(Debug, Clone, Copy)]
pub struct ToolInvocation<'a> {
    pub call: &'a ToolCallPart,
    pub context: &'a ToolExecutionContext,
}

impl<'a> ToolInvocation<'a> {
    pub fn new(call: &'a ToolCallPart, context: &'a ToolExecutionContext) -> Self {
        Self { call, context }
    }

    pub fn tool_name(&self) -> &'a str {
        &self.call.name
    }

    pub fn call_id(&self) -> &'a str {
        &self.call.id
    }

    pub fn run_id(&self) -> Option<&'a RunId> {
        self.context.run_id.as_ref()
    }

    /// Zero-based model call that produced this tool call.
    pub fn iteration(&self) -> u32 {
        self.context.iteration
    }

    pub fn position(&self) -> BatchPosition {
        self.context.batch
    }
}

/// How a single call ended.
#[derive(Debug, Clone, Copy)]
pub enum ToolOutcome<'a> {
    Completed(&'a ToolExecutionResult),
    Failed(&'a ToolError),
}

impl ToolOutcome<'_> {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// `"ok"` or the error kind, for use as a metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "ok",
            Self::Failed(error) => error.kind.as_str(),
        }
    }
}

pub trait ToolRuntimeHooks: Send + Sync {
    fn on_call_started(&self, _invocation: ToolInvocation<'_>) {}

    fn on_call_finished(
        &self,
        _invocation: ToolInvocation<'_>,
        _outcome: ToolOutcome<'_>,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopToolRuntimeHooks;

impl ToolRuntimeHooks for NoopToolRuntimeHooks {}
