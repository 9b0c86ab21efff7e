//! Streaming orchestration over chat models and tools.
//!
//! ```rust
//! use wchat::{ChatResultAccumulator, StreamingChunk};
//! use wprovider::FinishReason;
//!
//! let mut accumulator = ChatResultAccumulator::new();
//! accumulator.add(&StreamingChunk::text("hi"));
//! accumulator.add(&StreamingChunk::default().with_finish_reason(FinishReason::Stop));
//!
//! let result = accumulator.build();
//! assert_eq!(result.output_text, "hi");
//! assert_eq!(result.finish_reason, FinishReason::Stop);
//! ```

mod accumulator;
mod error;
mod hooks;
mod media;
mod orchestrator;
mod state;
mod strategy;
mod types;

pub mod prelude {
    pub use crate::{
        ChatChunkStream, ChatError, ChatErrorKind, ChatErrorPhase, ChatOrchestrator,
        ChatOrchestratorBuilder, ChatRunResult, OrchestrationHooks, OrchestratorPolicy,
        RunRequest, StrategyKind, StreamingChunk,
    };
    pub use wcommon::{MetadataMap, RunId, SessionId, TraceId};
    pub use wtooling::{
        DefaultToolRuntime, Tool, ToolError, ToolErrorKind, ToolExecutionContext,
        ToolExecutionResult, ToolRegistry, ToolRuntime,
    };
}

pub use accumulator::{ChatResultAccumulator, MessageAccumulator, merge_metadata};
pub use error::{ChatError, ChatErrorKind, ChatErrorPhase};
pub use hooks::{NoopOrchestrationHooks, OrchestrationHooks};
pub use media::{
    MediaResultAccumulator, MediaRunResult, PartialAssetTracker, collect_media, generate_media,
};
pub use orchestrator::{ChatOrchestrator, ChatOrchestratorBuilder, OrchestratorPolicy};
pub use state::{RunShape, StreamingState, WorkflowPhase};
pub use strategy::{
    CallPlan, DefaultStrategy, DualPhaseStrategy, IterationStep, OrchestrationStrategy,
    StrategyKind,
};
pub use types::{
    ChatChunkStream, ChatRunResult, ITERATION_LIMIT_KEY, RunRequest, SUPPRESSED_TEXT_KEY,
    SUPPRESSED_THINKING_KEY, SUPPRESSED_TOOL_CALLS_KEY, StreamingChunk,
};
pub use wcommon::{MetadataMap, RunId, SessionId, TraceId};
pub use wtooling::{
    DefaultToolRuntime, Tool, ToolError, ToolErrorKind, ToolExecutionContext, ToolExecutionResult,
    ToolRegistry, ToolRuntime,
};
