//! Wrappers that keep a panicking hook from unwinding into a run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use wchat::{ChatError, OrchestrationHooks, StrategyKind, WorkflowPhase};
use wcommon::RunId;
use wprovider::{FinishReason, ProviderError, ProviderOperationHooks, ToolCallPart, ToolResultPart};
use wtooling::{ToolInvocation, ToolOutcome, ToolRuntimeHooks};

fn isolate(hook: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(hook)).is_err() {
        tracing::warn!(event = "hook_panicked", "observability hook panicked; ignoring");
    }
}

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_attempt_start(&self, model: &str, operation: &str, attempt: u32) {
        isolate(|| self.inner.on_attempt_start(model, operation, attempt));
    }

    fn on_retry_scheduled(
        &self,
        model: &str,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        isolate(|| {
            self.inner
                .on_retry_scheduled(model, operation, attempt, delay, error)
        });
    }

    fn on_success(&self, model: &str, operation: &str, attempts: u32) {
        isolate(|| self.inner.on_success(model, operation, attempts));
    }

    fn on_failure(&self, model: &str, operation: &str, attempts: u32, error: &ProviderError) {
        isolate(|| self.inner.on_failure(model, operation, attempts, error));
    }
}

pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H> ToolRuntimeHooks for SafeToolHooks<H>
where
    H: ToolRuntimeHooks,
{
    fn on_call_started(&self, invocation: ToolInvocation<'_>) {
        isolate(|| self.inner.on_call_started(invocation));
    }

    fn on_call_finished(
        &self,
        invocation: ToolInvocation<'_>,
        outcome: ToolOutcome<'_>,
        elapsed: Duration,
    ) {
        isolate(|| self.inner.on_call_finished(invocation, outcome, elapsed));
    }
}

pub struct SafeOrchestrationHooks<H> {
    inner: H,
}

impl<H> SafeOrchestrationHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H> OrchestrationHooks for SafeOrchestrationHooks<H>
where
    H: OrchestrationHooks,
{
    fn on_run_start(&self, run_id: &RunId, strategy: StrategyKind) {
        isolate(|| self.inner.on_run_start(run_id, strategy));
    }

    fn on_model_call(&self, run_id: &RunId, iteration: u32, phase: WorkflowPhase) {
        isolate(|| self.inner.on_model_call(run_id, iteration, phase));
    }

    fn on_phase_change(&self, run_id: &RunId, from: WorkflowPhase, to: WorkflowPhase) {
        isolate(|| self.inner.on_phase_change(run_id, from, to));
    }

    fn on_tool_batch_start(&self, run_id: &RunId, iteration: u32, calls: &[ToolCallPart]) {
        isolate(|| self.inner.on_tool_batch_start(run_id, iteration, calls));
    }

    fn on_tool_batch_complete(
        &self,
        run_id: &RunId,
        iteration: u32,
        results: &[ToolResultPart],
        elapsed: Duration,
    ) {
        isolate(|| {
            self.inner
                .on_tool_batch_complete(run_id, iteration, results, elapsed)
        });
    }

    fn on_run_complete(&self, run_id: &RunId, model_calls: u32, finish_reason: FinishReason) {
        isolate(|| self.inner.on_run_complete(run_id, model_calls, finish_reason));
    }

    fn on_run_failure(&self, run_id: &RunId, error: &ChatError) {
        isolate(|| self.inner.on_run_failure(run_id, error));
    }
}
