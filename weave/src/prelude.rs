//! Common imports for most weave applications.

pub use crate::{
    Observability, RuntimeBuilder, model_message, observed_orchestrator, orchestrator,
    orchestrator_with_tools, run, structured_run, system_message, user_message,
};
pub use crate::{wv_messages, wv_msg, wv_run};
pub use crate::{
    BoxFuture, ChatError, ChatErrorKind, ChatModel, ChatOrchestrator, ChatRunResult,
    DefaultToolRuntime, FinishReason, Message, ModelCapabilities, ModelChunk, ModelRequest,
    Part, ProviderError, RetryPolicy, Role, RunRequest, SessionId, StrategyKind, StreamingChunk,
    Tool, ToolDefinition, ToolError, ToolExecutionContext, ToolRegistry, ToolRuntime, Usage,
};
