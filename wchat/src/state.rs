//! Per-run mutable state threaded through the orchestration loop.

use wcommon::MetadataMap;
use wprovider::{Message, ModelChunk, ToolCallPart};

use crate::accumulator::{MessageAccumulator, merge_metadata};

/// Which sub-request of a run the loop is currently driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowPhase {
    /// One request shape for the whole run.
    #[default]
    Single,
    /// Tools enabled, schema withheld, text suppressed.
    ToolPhase,
    /// Schema enabled, tools withheld, text streamed.
    OutputPhase,
}

/// What the caller asked this run to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunShape {
    pub tools: bool,
    pub output_schema: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StreamingState {
    conversation_history: Vec<Message>,
    accumulated: MessageAccumulator,
    suppressed_text_parts: Vec<String>,
    suppressed_thinking_parts: Vec<String>,
    suppressed_metadata: MetadataMap,
    suppressed_tool_calls: Vec<ToolCallPart>,
    last_result: Option<Message>,
    shape: RunShape,
    phase: WorkflowPhase,
    iteration: u32,
    appended: usize,
}

impl StreamingState {
    pub fn new(history: Vec<Message>, shape: RunShape) -> Self {
        Self {
            conversation_history: history,
            shape,
            ..Self::default()
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.conversation_history
    }

    /// Appends one entry; history never shrinks during a run.
    pub fn append_to_history(&mut self, message: Message) {
        self.conversation_history.push(message);
        self.appended += 1;
    }

    /// Entries appended since the run started.
    pub fn appended_messages(&self) -> &[Message] {
        let start = self.conversation_history.len() - self.appended;
        &self.conversation_history[start..]
    }

    pub fn shape(&self) -> RunShape {
        self.shape
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: WorkflowPhase) {
        self.phase = phase;
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Counts a model call and returns its zero-based index.
    pub fn begin_iteration(&mut self) -> u32 {
        let current = self.iteration;
        self.iteration += 1;
        current
    }

    pub fn accumulate(&mut self, chunk: &ModelChunk) {
        self.accumulated.add_chunk(chunk);
    }

    pub fn accumulated(&self) -> &MessageAccumulator {
        &self.accumulated
    }

    /// Consolidates the in-progress model message for the current call.
    pub fn take_accumulated(&mut self) -> Message {
        let iteration = self.iteration.saturating_sub(1);
        let message = self.accumulated.consolidate(iteration);
        self.last_result = Some(message.clone());
        message
    }

    pub fn last_result(&self) -> Option<&Message> {
        self.last_result.as_ref()
    }

    pub fn suppress_chunk(&mut self, chunk: &ModelChunk) {
        let text = chunk.text_delta();
        if !text.is_empty() {
            self.suppressed_text_parts.push(text);
        }
        if let Some(thinking) = chunk.thinking.as_deref().filter(|t| !t.is_empty()) {
            self.suppressed_thinking_parts.push(thinking.to_string());
        }
        merge_metadata(&mut self.suppressed_metadata, &chunk.metadata);
    }

    pub fn suppress_tool_calls(&mut self, calls: &[ToolCallPart]) {
        self.suppressed_tool_calls.extend(calls.iter().cloned());
    }

    pub fn suppressed_text(&self) -> String {
        self.suppressed_text_parts.concat()
    }

    pub fn suppressed_thinking(&self) -> String {
        self.suppressed_thinking_parts.concat()
    }

    pub fn suppressed_metadata(&self) -> &MetadataMap {
        &self.suppressed_metadata
    }

    pub fn suppressed_tool_calls(&self) -> &[ToolCallPart] {
        &self.suppressed_tool_calls
    }

    pub fn reset_suppression(&mut self) {
        self.suppressed_text_parts.clear();
        self.suppressed_thinking_parts.clear();
        self.suppressed_metadata.clear();
        self.suppressed_tool_calls.clear();
    }
}
