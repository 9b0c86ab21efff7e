//! Metrics-based observability hooks for model calls, tool runs, and orchestration.
//!
//! ```rust
//! use wobserve::MetricsObservabilityHooks;
//! use wprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use wchat::{ChatError, OrchestrationHooks, StrategyKind, WorkflowPhase};
use wcommon::RunId;
use wprovider::{FinishReason, ProviderError, ProviderOperationHooks, ToolResultPart};
use wtooling::{ToolInvocation, ToolOutcome, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, model: &str, operation: &str, _attempt: u32) {
        metrics::counter!(
            "weave_provider_attempt_start_total",
            "model" => model.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        model: &str,
        operation: &str,
        _attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "weave_provider_retry_scheduled_total",
            "model" => model.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "weave_provider_retry_delay_seconds",
            "model" => model.to_string(),
            "operation" => operation.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_success(&self, model: &str, operation: &str, attempts: u32) {
        metrics::histogram!(
            "weave_provider_attempts_per_success",
            "model" => model.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }

    fn on_failure(&self, model: &str, operation: &str, attempts: u32, error: &ProviderError) {
        metrics::counter!(
            "weave_provider_failure_total",
            "model" => model.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "weave_provider_attempts_per_failure",
            "model" => model.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }
}

impl ToolRuntimeHooks for MetricsObservabilityHooks {
    fn on_call_started(&self, invocation: ToolInvocation<'_>) {
        metrics::counter!(
            "weave_tool_call_start_total",
            "tool_name" => invocation.tool_name().to_string()
        )
        .increment(1);
        metrics::histogram!("weave_tool_call_batch_index")
            .record(invocation.position().index as f64);
    }

    fn on_call_finished(
        &self,
        invocation: ToolInvocation<'_>,
        outcome: ToolOutcome<'_>,
        elapsed: Duration,
    ) {
        metrics::histogram!(
            "weave_tool_call_duration_seconds",
            "tool_name" => invocation.tool_name().to_string(),
            "outcome" => outcome.label()
        )
        .record(elapsed.as_secs_f64());

        if outcome.is_failure() {
            metrics::counter!(
                "weave_tool_call_failure_total",
                "tool_name" => invocation.tool_name().to_string(),
                "error_kind" => outcome.label()
            )
            .increment(1);
        }
    }
}

impl OrchestrationHooks for MetricsObservabilityHooks {
    fn on_run_start(&self, _run_id: &RunId, strategy: StrategyKind) {
        metrics::counter!("weave_run_start_total", "strategy" => format!("{strategy:?}"))
            .increment(1);
    }

    fn on_model_call(&self, _run_id: &RunId, _iteration: u32, phase: WorkflowPhase) {
        metrics::counter!("weave_model_call_total", "workflow_phase" => format!("{phase:?}"))
            .increment(1);
    }

    fn on_phase_change(&self, _run_id: &RunId, _from: WorkflowPhase, to: WorkflowPhase) {
        metrics::counter!("weave_phase_change_total", "to" => format!("{to:?}")).increment(1);
    }

    fn on_tool_batch_complete(
        &self,
        _run_id: &RunId,
        _iteration: u32,
        results: &[ToolResultPart],
        elapsed: Duration,
    ) {
        metrics::histogram!("weave_tool_batch_size").record(results.len() as f64);
        metrics::histogram!("weave_tool_batch_duration_seconds").record(elapsed.as_secs_f64());
    }

    fn on_run_complete(&self, _run_id: &RunId, model_calls: u32, finish_reason: FinishReason) {
        metrics::counter!(
            "weave_run_complete_total",
            "finish_reason" => format!("{finish_reason:?}")
        )
        .increment(1);
        metrics::histogram!("weave_model_calls_per_run").record(model_calls as f64);
    }

    fn on_run_failure(&self, _run_id: &RunId, error: &ChatError) {
        metrics::counter!(
            "weave_run_failure_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }
}
