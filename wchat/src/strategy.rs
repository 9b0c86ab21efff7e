//! Orchestration strategies: the hook points that shape each iteration.
//!
//! The orchestrator owns the loop; a strategy decides what each model call
//! may use, whether text is surfaced, and what happens once a call's
//! response has been consolidated.
//!
//! ```rust
//! use wchat::StrategyKind;
//! use wprovider::ModelCapabilities;
//!
//! assert_eq!(
//!     StrategyKind::for_capabilities(&ModelCapabilities::tools_xor_schema()),
//!     StrategyKind::DualPhase
//! );
//! assert_eq!(
//!     StrategyKind::for_capabilities(&ModelCapabilities::full()),
//!     StrategyKind::Default
//! );
//! ```

use std::sync::Arc;

use serde_json::{Value, json};
use wcommon::MetadataMap;
use wprovider::{Message, ModelCapabilities, ToolCallPart, ToolDefinition};
use wtooling::extract_tool_calls;

use crate::{
    SUPPRESSED_TEXT_KEY, SUPPRESSED_THINKING_KEY, SUPPRESSED_TOOL_CALLS_KEY, StreamingState,
    WorkflowPhase,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    Default,
    DualPhase,
}

impl StrategyKind {
    /// Dual-phase only when the model has both capabilities but cannot
    /// combine them in one request.
    pub fn for_capabilities(capabilities: &ModelCapabilities) -> Self {
        if capabilities.tools && capabilities.output_schema && !capabilities.tools_with_output_schema
        {
            Self::DualPhase
        } else {
            Self::Default
        }
    }

    pub fn into_strategy(self) -> Arc<dyn OrchestrationStrategy> {
        match self {
            Self::Default => Arc::new(DefaultStrategy),
            Self::DualPhase => Arc::new(DualPhaseStrategy),
        }
    }
}

/// Tools and schema offered to one model call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallPlan {
    pub tools: Vec<ToolDefinition>,
    pub output_schema: Option<Value>,
}

/// What the loop does with a consolidated model message.
#[derive(Debug, Clone, PartialEq)]
pub enum IterationStep {
    /// Nothing actionable came back; stop without touching history.
    Empty,
    /// Append the message and stop.
    Finish(Message),
    /// Append the message, run the calls, append their results, loop.
    ExecuteTools {
        message: Message,
        calls: Vec<ToolCallPart>,
    },
    /// Loop again without appending anything.
    Continue,
}

pub trait OrchestrationStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn initialize(&self, _state: &mut StreamingState) {}

    fn allow_text_streaming(&self, _state: &StreamingState) -> bool {
        true
    }

    fn before_model_call(&self, _state: &StreamingState, plan: CallPlan) -> CallPlan {
        plan
    }

    fn process_iteration(&self, state: &mut StreamingState, message: Message) -> IterationStep;

    /// Metadata for the closing chunk of a run that ends without a final
    /// message, either on an empty response or at the iteration limit.
    fn closing_metadata(&self, _state: &StreamingState) -> MetadataMap {
        MetadataMap::new()
    }
}

/// Single-phase tool loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStrategy;

impl DefaultStrategy {
    fn step(message: Message) -> IterationStep {
        if message.is_empty_response() {
            return IterationStep::Empty;
        }

        let calls = extract_tool_calls(&message);
        if calls.is_empty() {
            IterationStep::Finish(message)
        } else {
            IterationStep::ExecuteTools { message, calls }
        }
    }
}

impl OrchestrationStrategy for DefaultStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Default
    }

    fn initialize(&self, state: &mut StreamingState) {
        state.set_phase(WorkflowPhase::Single);
        state.reset_suppression();
    }

    fn process_iteration(&self, _state: &mut StreamingState, message: Message) -> IterationStep {
        Self::step(message)
    }
}

/// Emulates "tools plus structured output" on models that accept only one
/// of the two per request.
///
/// Phase one offers tools without the schema and suppresses text; once the
/// model stops calling tools, phase two offers the schema without tools and
/// the final message carries phase one's suppressed content in metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct DualPhaseStrategy;

impl DualPhaseStrategy {
    /// Phase one's buffered output, keyed the way the final message carries it.
    fn handoff(state: &StreamingState) -> MetadataMap {
        let mut suppressed = state.suppressed_metadata().clone();
        let calls: Vec<Value> = state
            .suppressed_tool_calls()
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "name": call.name,
                    "arguments": call.arguments,
                })
            })
            .collect();
        suppressed.insert("tool_calls".to_string(), Value::Array(calls));

        let mut handoff = MetadataMap::new();
        handoff.insert(
            SUPPRESSED_TEXT_KEY.to_string(),
            Value::String(state.suppressed_text()),
        );
        handoff.insert(SUPPRESSED_TOOL_CALLS_KEY.to_string(), Value::Object(suppressed));

        let thinking = state.suppressed_thinking();
        if !thinking.is_empty() {
            handoff.insert(SUPPRESSED_THINKING_KEY.to_string(), Value::String(thinking));
        }
        handoff
    }

    fn finish_output_phase(state: &StreamingState, mut message: Message) -> Message {
        message.metadata.extend(Self::handoff(state));
        message
    }
}

impl OrchestrationStrategy for DualPhaseStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DualPhase
    }

    fn initialize(&self, state: &mut StreamingState) {
        let shape = state.shape();
        let phase = if shape.tools && shape.output_schema {
            WorkflowPhase::ToolPhase
        } else {
            WorkflowPhase::Single
        };
        state.set_phase(phase);
        state.reset_suppression();
    }

    fn allow_text_streaming(&self, state: &StreamingState) -> bool {
        state.phase() != WorkflowPhase::ToolPhase
    }

    fn before_model_call(&self, state: &StreamingState, mut plan: CallPlan) -> CallPlan {
        match state.phase() {
            WorkflowPhase::ToolPhase => plan.output_schema = None,
            WorkflowPhase::OutputPhase => plan.tools.clear(),
            WorkflowPhase::Single => {}
        }
        plan
    }

    fn process_iteration(&self, state: &mut StreamingState, message: Message) -> IterationStep {
        match state.phase() {
            WorkflowPhase::Single => DefaultStrategy::step(message),
            WorkflowPhase::ToolPhase => {
                let calls = extract_tool_calls(&message);
                if calls.is_empty() {
                    // The phase's closing message lives on only through the
                    // suppressed buffers.
                    state.set_phase(WorkflowPhase::OutputPhase);
                    IterationStep::Continue
                } else {
                    state.suppress_tool_calls(&calls);
                    IterationStep::ExecuteTools { message, calls }
                }
            }
            WorkflowPhase::OutputPhase if message.is_empty_response() => IterationStep::Empty,
            WorkflowPhase::OutputPhase => {
                IterationStep::Finish(Self::finish_output_phase(state, message))
            }
        }
    }

    fn closing_metadata(&self, state: &StreamingState) -> MetadataMap {
        match state.phase() {
            WorkflowPhase::Single => MetadataMap::new(),
            WorkflowPhase::ToolPhase | WorkflowPhase::OutputPhase => Self::handoff(state),
        }
    }
}
