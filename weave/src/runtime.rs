//! Runtime wiring helpers for orchestrated runs.
//!
//! [`RuntimeBuilder`] assembles a model, its tools, retry behavior, and
//! observability hooks into a ready [`ChatOrchestrator`].

use std::sync::Arc;
use std::time::Duration;

use wobserve::{
    MetricsObservabilityHooks, SafeOrchestrationHooks, SafeProviderHooks, SafeToolHooks,
    TracingObservabilityHooks,
};

use crate::{
    ChatError, ChatModel, ChatOrchestrator, DefaultToolRuntime, OrchestrationHooks,
    OrchestratorPolicy, ProviderOperationHooks, RetryPolicy, RetryingChatModel, StrategyKind,
    ToolExecutionPolicy, ToolRegistry, ToolRuntimeHooks,
};

/// Which built-in hooks a runtime reports through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Observability {
    #[default]
    Off,
    Tracing,
    Metrics,
}

struct HookSet {
    provider: Arc<dyn ProviderOperationHooks>,
    tools: Arc<dyn ToolRuntimeHooks>,
    orchestration: Arc<dyn OrchestrationHooks>,
}

impl HookSet {
    fn wrap<H>(hooks: H) -> Self
    where
        H: ProviderOperationHooks + ToolRuntimeHooks + OrchestrationHooks + Copy + 'static,
    {
        Self {
            provider: Arc::new(SafeProviderHooks::new(hooks)),
            tools: Arc::new(SafeToolHooks::new(hooks)),
            orchestration: Arc::new(SafeOrchestrationHooks::new(hooks)),
        }
    }

    fn for_observability(observability: Observability) -> Option<Self> {
        match observability {
            Observability::Off => None,
            Observability::Tracing => Some(Self::wrap(TracingObservabilityHooks)),
            Observability::Metrics => Some(Self::wrap(MetricsObservabilityHooks)),
        }
    }
}

pub struct RuntimeBuilder {
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
    retry_policy: Option<RetryPolicy>,
    tool_timeout: Option<Duration>,
    strategy: Option<StrategyKind>,
    policy: OrchestratorPolicy,
    observability: Observability,
}

impl RuntimeBuilder {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            registry: ToolRegistry::new(),
            retry_policy: None,
            tool_timeout: None,
            strategy: None,
            policy: OrchestratorPolicy::default(),
            observability: Observability::Off,
        }
    }

    pub fn tools(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Retries opening a model stream; chunks already delivered are never replayed.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn strategy(mut self, kind: StrategyKind) -> Self {
        self.strategy = Some(kind);
        self
    }

    pub fn policy(mut self, policy: OrchestratorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.policy.max_iterations = max_iterations;
        self
    }

    pub fn max_concurrent_tools(mut self, max_concurrent_tools: usize) -> Self {
        self.policy = self.policy.with_max_concurrent_tools(max_concurrent_tools);
        self
    }

    pub fn observability(mut self, observability: Observability) -> Self {
        self.observability = observability;
        self
    }

    pub fn build(self) -> Result<ChatOrchestrator, ChatError> {
        let hooks = HookSet::for_observability(self.observability);

        let model: Arc<dyn ChatModel> = match self.retry_policy {
            Some(policy) => {
                let mut retrying = RetryingChatModel::new(self.model, policy);
                if let Some(hooks) = &hooks {
                    retrying = retrying.with_hooks(Arc::clone(&hooks.provider));
                }
                Arc::new(retrying)
            }
            None => self.model,
        };

        let mut runtime = DefaultToolRuntime::new(Arc::new(self.registry));
        if let Some(timeout) = self.tool_timeout {
            runtime = runtime.with_policy(ToolExecutionPolicy::with_timeout(timeout));
        }
        if let Some(hooks) = &hooks {
            runtime = runtime.with_hooks(Arc::clone(&hooks.tools));
        }

        let mut builder = ChatOrchestrator::builder(model)
            .tool_runtime(Arc::new(runtime))
            .policy(self.policy);
        if let Some(kind) = self.strategy {
            builder = builder.strategy(kind);
        }
        if let Some(hooks) = hooks {
            builder = builder.hooks(hooks.orchestration);
        }

        builder.build()
    }
}

pub fn orchestrator(model: Arc<dyn ChatModel>) -> Result<ChatOrchestrator, ChatError> {
    RuntimeBuilder::new(model).build()
}

pub fn orchestrator_with_tools(
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
) -> Result<ChatOrchestrator, ChatError> {
    RuntimeBuilder::new(model).tools(registry).build()
}

/// Tools plus tracing on every layer and retries with the default policy.
pub fn observed_orchestrator(
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
) -> Result<ChatOrchestrator, ChatError> {
    RuntimeBuilder::new(model)
        .tools(registry)
        .retry_policy(RetryPolicy::default())
        .observability(Observability::Tracing)
        .build()
}
