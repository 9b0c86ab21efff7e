//! Retry/backoff for chat model transports and the hooks that observe it.
//!
//! Retries apply to opening a stream only. A stream that fails after it has
//! started yielding chunks is surfaced to the caller as-is, since replaying
//! it would duplicate output that was already delivered.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_timer::Delay;

use crate::{
    BoxedChunkStream, ChatModel, ModelCapabilities, ModelRequest, ProviderError, ProviderFuture,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn disabled() -> Self {
        Self::new(1)
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    pub fn should_retry(&self, attempt: u32, error: &ProviderError) -> bool {
        error.retryable && attempt < self.max_attempts
    }

    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let unbounded = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(unbounded.min(self.max_backoff.as_secs_f64()))
    }
}

pub trait ProviderOperationHooks: Send + Sync {
    fn on_attempt_start(&self, _model: &str, _operation: &str, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _model: &str,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &ProviderError,
    ) {
    }

    fn on_success(&self, _model: &str, _operation: &str, _attempts: u32) {}

    fn on_failure(&self, _model: &str, _operation: &str, _attempts: u32, _error: &ProviderError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

pub async fn execute_with_retry<T, Op, OpFuture, Sleep, SleepFuture>(
    model: &str,
    operation: &str,
    policy: &RetryPolicy,
    hooks: &dyn ProviderOperationHooks,
    mut execute: Op,
    mut sleep: Sleep,
) -> Result<T, ProviderError>
where
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, ProviderError>>,
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let mut attempt = 1;

    loop {
        hooks.on_attempt_start(model, operation, attempt);

        match execute(attempt).await {
            Ok(value) => {
                hooks.on_success(model, operation, attempt);
                return Ok(value);
            }
            Err(error) if policy.should_retry(attempt, &error) => {
                let delay = policy.backoff_for_attempt(attempt);
                hooks.on_retry_scheduled(model, operation, attempt, delay, &error);
                sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                hooks.on_failure(model, operation, attempt, &error);
                return Err(error);
            }
        }
    }
}

/// Decorates a chat model so that opening a stream is retried per policy.
pub struct RetryingChatModel {
    inner: Arc<dyn ChatModel>,
    policy: RetryPolicy,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl RetryingChatModel {
    pub fn new(inner: Arc<dyn ChatModel>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl ChatModel for RetryingChatModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn capabilities(&self) -> ModelCapabilities {
        self.inner.capabilities()
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            let inner = &self.inner;
            execute_with_retry(
                inner.name(),
                "stream",
                &self.policy,
                self.hooks.as_ref(),
                |_attempt| inner.stream(request.clone()),
                Delay::new,
            )
            .await
        })
    }

    fn dispose(&self) {
        self.inner.dispose();
    }
}
