//! Unified facade over the weave workspace crates.
//!
//! This crate is the single dependency for most applications. It re-exports
//! the model contract, tooling, orchestration, and observability crates, and
//! adds wiring helpers and macros for common setup and request-building flows.
//!
//! ```rust
//! use weave::{ToolDefinition, ToolRegistry, wv_run};
//! use serde_json::json;
//!
//! let mut tools = ToolRegistry::new();
//! tools.register_sync_fn(
//!     ToolDefinition::new("now", "Current time", json!({"type": "object"})),
//!     |_args, _ctx| Ok(json!("12:00")),
//! );
//!
//! let request = wv_run!("session-1", "What time is it?");
//! assert!(request.tools_enabled);
//! assert_eq!(tools.len(), 1);
//! ```

mod macros;

pub mod prelude;
pub mod runtime;
pub mod util;

pub use wchat;
pub use wcommon;
pub use wobserve;
pub use wprovider;
pub use wtooling;

pub use wchat::{
    CallPlan, ChatChunkStream, ChatError, ChatErrorKind, ChatErrorPhase, ChatOrchestrator,
    ChatOrchestratorBuilder, ChatResultAccumulator, ChatRunResult, DefaultStrategy,
    DualPhaseStrategy, ITERATION_LIMIT_KEY, IterationStep, MediaResultAccumulator,
    MediaRunResult, MessageAccumulator, NoopOrchestrationHooks, OrchestrationHooks,
    OrchestrationStrategy, OrchestratorPolicy, PartialAssetTracker, RunRequest, RunShape,
    SUPPRESSED_TEXT_KEY, SUPPRESSED_THINKING_KEY, SUPPRESSED_TOOL_CALLS_KEY, StrategyKind,
    StreamingChunk, StreamingState, WorkflowPhase, collect_media, generate_media,
    merge_metadata,
};
pub use wcommon::{BoxFuture, GenerationOptions, MetadataMap, Registry, RunId, SessionId, TraceId};
pub use wobserve::{
    MetricsObservabilityHooks, SafeOrchestrationHooks, SafeProviderHooks, SafeToolHooks,
    TracingObservabilityHooks,
};
pub use wprovider::{
    BoxedChunkStream, BoxedMediaStream, ChatModel, DataPart, FinishReason, LinkPart, MediaChunk,
    MediaGenerationModel, MediaRequest, Message, ModelCapabilities, ModelChunk, ModelRequest,
    NoopOperationHooks, PartialAssetFragment, Part, ProviderError, ProviderErrorKind,
    ProviderFuture, ProviderOperationHooks, RetryPolicy, RetryingChatModel, Role, ToolCallPart,
    ToolDefinition, ToolResultPart, Usage, VecChunkStream, execute_with_retry,
};
pub use wtooling::{
    BatchPosition, DefaultToolRuntime, FunctionTool, NoopToolRuntimeHooks, Tool,
    ToolBatchExecutor, ToolError, ToolErrorKind, ToolExecutionContext, ToolExecutionPolicy,
    ToolExecutionResult, ToolFuture, ToolInvocation, ToolOutcome, ToolRegistry, ToolRuntime,
    ToolRuntimeHooks, normalize_arguments, parse_json_object, parse_json_value, required_string,
};

pub use runtime::{
    Observability, RuntimeBuilder, observed_orchestrator, orchestrator, orchestrator_with_tools,
};
pub use util::{
    model_message, parse_role, parse_strategy_kind, run, structured_run, system_message,
    user_message,
};
