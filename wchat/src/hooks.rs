//! Lifecycle hooks for orchestration runs.
//!
//! ```rust
//! use wchat::{NoopOrchestrationHooks, OrchestrationHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn OrchestrationHooks) {}
//!
//! assert_hooks_trait(&NoopOrchestrationHooks);
//! ```

use std::time::Duration;

use wcommon::RunId;
use wprovider::{FinishReason, ToolCallPart, ToolResultPart};

use crate::{ChatError, StrategyKind, WorkflowPhase};

pub trait OrchestrationHooks: Send + Sync {
    fn on_run_start(&self, _run_id: &RunId, _strategy: StrategyKind) {}

    fn on_model_call(&self, _run_id: &RunId, _iteration: u32, _phase: WorkflowPhase) {}

    fn on_phase_change(&self, _run_id: &RunId, _from: WorkflowPhase, _to: WorkflowPhase) {}

    fn on_tool_batch_start(&self, _run_id: &RunId, _iteration: u32, _calls: &[ToolCallPart]) {}

    fn on_tool_batch_complete(
        &self,
        _run_id: &RunId,
        _iteration: u32,
        _results: &[ToolResultPart],
        _elapsed: Duration,
    ) {
    }

    fn on_run_complete(&self, _run_id: &RunId, _model_calls: u32, _finish_reason: FinishReason) {}

    fn on_run_failure(&self, _run_id: &RunId, _error: &ChatError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOrchestrationHooks;

impl OrchestrationHooks for NoopOrchestrationHooks {}
