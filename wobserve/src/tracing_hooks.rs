//! Tracing-based observability hooks for model calls, tool runs, and orchestration.
//!
//! ```rust
//! use wchat::OrchestrationHooks;
//! use wobserve::TracingObservabilityHooks;
//!
//! fn accepts_orchestration_hooks(_hooks: &dyn OrchestrationHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_orchestration_hooks(&hooks);
//! ```

use std::time::Duration;

use wchat::{ChatError, OrchestrationHooks, StrategyKind, WorkflowPhase};
use wcommon::RunId;
use wprovider::{FinishReason, ProviderError, ProviderOperationHooks, ToolCallPart, ToolResultPart};
use wtooling::{ToolInvocation, ToolOutcome, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, model: &str, operation: &str, attempt: u32) {
        tracing::debug!(
            phase = "provider",
            event = "attempt_start",
            model,
            operation,
            attempt
        );
    }

    fn on_retry_scheduled(
        &self,
        model: &str,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        tracing::warn!(
            phase = "provider",
            event = "retry_scheduled",
            model,
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_success(&self, model: &str, operation: &str, attempts: u32) {
        tracing::debug!(
            phase = "provider",
            event = "success",
            model,
            operation,
            attempts
        );
    }

    fn on_failure(&self, model: &str, operation: &str, attempts: u32, error: &ProviderError) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            model,
            operation,
            attempts,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }
}

impl ToolRuntimeHooks for TracingObservabilityHooks {
    fn on_call_started(&self, invocation: ToolInvocation<'_>) {
        tracing::info!(
            phase = "tool",
            event = "call_started",
            tool_name = invocation.tool_name(),
            tool_call_id = invocation.call_id(),
            run_id = invocation.run_id().map(|id| id.as_str()),
            session_id = %invocation.context.session_id,
            iteration = invocation.iteration(),
            batch_slot = %invocation.position()
        );
    }

    fn on_call_finished(
        &self,
        invocation: ToolInvocation<'_>,
        outcome: ToolOutcome<'_>,
        elapsed: Duration,
    ) {
        match outcome {
            ToolOutcome::Completed(_) => tracing::info!(
                phase = "tool",
                event = "call_completed",
                tool_name = invocation.tool_name(),
                tool_call_id = invocation.call_id(),
                run_id = invocation.run_id().map(|id| id.as_str()),
                iteration = invocation.iteration(),
                batch_slot = %invocation.position(),
                elapsed_ms = elapsed.as_millis() as u64
            ),
            ToolOutcome::Failed(error) => tracing::warn!(
                phase = "tool",
                event = "call_failed",
                tool_name = invocation.tool_name(),
                tool_call_id = invocation.call_id(),
                run_id = invocation.run_id().map(|id| id.as_str()),
                iteration = invocation.iteration(),
                batch_slot = %invocation.position(),
                elapsed_ms = elapsed.as_millis() as u64,
                error_kind = error.kind.as_str(),
                retryable = error.retryable,
                error = %error
            ),
        }
    }
}

impl OrchestrationHooks for TracingObservabilityHooks {
    fn on_run_start(&self, run_id: &RunId, strategy: StrategyKind) {
        tracing::info!(
            phase = "orchestration",
            event = "run_start",
            run_id = %run_id,
            strategy = ?strategy
        );
    }

    fn on_model_call(&self, run_id: &RunId, iteration: u32, phase: WorkflowPhase) {
        tracing::debug!(
            phase = "orchestration",
            event = "model_call",
            run_id = %run_id,
            iteration,
            workflow_phase = ?phase
        );
    }

    fn on_phase_change(&self, run_id: &RunId, from: WorkflowPhase, to: WorkflowPhase) {
        tracing::info!(
            phase = "orchestration",
            event = "phase_change",
            run_id = %run_id,
            from = ?from,
            to = ?to
        );
    }

    fn on_tool_batch_start(&self, run_id: &RunId, iteration: u32, calls: &[ToolCallPart]) {
        tracing::debug!(
            phase = "orchestration",
            event = "tool_batch_start",
            run_id = %run_id,
            iteration,
            calls = calls.len()
        );
    }

    fn on_tool_batch_complete(
        &self,
        run_id: &RunId,
        iteration: u32,
        results: &[ToolResultPart],
        elapsed: Duration,
    ) {
        let failed = results.iter().filter(|result| result.is_error()).count();
        tracing::info!(
            phase = "orchestration",
            event = "tool_batch_complete",
            run_id = %run_id,
            iteration,
            results = results.len(),
            failed,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_run_complete(&self, run_id: &RunId, model_calls: u32, finish_reason: FinishReason) {
        tracing::info!(
            phase = "orchestration",
            event = "run_complete",
            run_id = %run_id,
            model_calls,
            finish_reason = ?finish_reason
        );
    }

    fn on_run_failure(&self, run_id: &RunId, error: &ChatError) {
        tracing::error!(
            phase = "orchestration",
            event = "run_failure",
            run_id = %run_id,
            error_kind = ?error.kind,
            error_phase = ?error.phase,
            retryable = error.retryable,
            error = %error
        );
    }
}
