//! Tool runtime trait and default registry-backed executor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_timer::Delay;
use futures_util::future::{Either, select};
use wprovider::{ToolCallPart, ToolDefinition};

use crate::{
    NoopToolRuntimeHooks, ToolError, ToolExecutionContext, ToolExecutionResult, ToolFuture,
    ToolInvocation, ToolOutcome, ToolRegistry, ToolRuntimeHooks,
};

pub trait ToolRuntime: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;

    fn execute<'a>(
        &'a self,
        tool_call: ToolCallPart,
        context: ToolExecutionContext,
    ) -> ToolFuture<'a, Result<ToolExecutionResult, ToolError>>;
}

/// Per-call limits enforced by [`DefaultToolRuntime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolExecutionPolicy {
    pub timeout: Option<Duration>,
}

impl ToolExecutionPolicy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[derive(Clone)]
pub struct DefaultToolRuntime {
    registry: Arc<ToolRegistry>,
    hooks: Arc<dyn ToolRuntimeHooks>,
    policy: ToolExecutionPolicy,
}

impl Default for DefaultToolRuntime {
    fn default() -> Self {
        Self::new(Arc::new(ToolRegistry::new()))
    }
}

impl DefaultToolRuntime {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            hooks: Arc::new(NoopToolRuntimeHooks),
            policy: ToolExecutionPolicy::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_policy(mut self, policy: ToolExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn policy(&self) -> ToolExecutionPolicy {
        self.policy
    }

    async fn invoke(
        &self,
        tool_call: &ToolCallPart,
        context: &ToolExecutionContext,
    ) -> Result<ToolExecutionResult, ToolError> {
        let tool = self.registry.resolve(tool_call)?;

        let invocation = tool.invoke(&tool_call.arguments, context);
        let output = match self.policy.timeout {
            Some(timeout) => match select(invocation, Delay::new(timeout)).await {
                Either::Left((output, _)) => output?,
                Either::Right(_) => {
                    return Err(ToolError::timeout(format!(
                        "tool '{}' exceeded {}ms",
                        tool_call.name,
                        timeout.as_millis()
                    )));
                }
            },
            None => invocation.await?,
        };

        Ok(ToolExecutionResult::from_call(tool_call, output))
    }
}

impl ToolRuntime for DefaultToolRuntime {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    fn execute<'a>(
        &'a self,
        tool_call: ToolCallPart,
        context: ToolExecutionContext,
    ) -> ToolFuture<'a, Result<ToolExecutionResult, ToolError>> {
        Box::pin(async move {
            let invocation = ToolInvocation::new(&tool_call, &context);
            self.hooks.on_call_started(invocation);
            let started = Instant::now();

            let outcome = self.invoke(&tool_call, &context).await.map_err(|error| {
                error
                    .with_tool_name(tool_call.name.clone())
                    .with_tool_call_id(tool_call.id.clone())
            });
            let reported = match &outcome {
                Ok(result) => ToolOutcome::Completed(result),
                Err(error) => ToolOutcome::Failed(error),
            };
            self.hooks
                .on_call_finished(invocation, reported, started.elapsed());

            outcome
        })
    }
}
