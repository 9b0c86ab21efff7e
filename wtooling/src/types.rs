//! Tool execution context and result types.

use std::fmt::{Display, Formatter};

use serde_json::Value;
use wcommon::{MetadataMap, RunId, SessionId, TraceId};
use wprovider::{ToolCallPart, ToolResultPart};

/// Slot of a call within the batch one model response produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPosition {
    pub index: usize,
    pub size: usize,
}

impl Default for BatchPosition {
    fn default() -> Self {
        Self { index: 0, size: 1 }
    }
}

impl Display for BatchPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.index + 1, self.size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecutionContext {
    pub session_id: SessionId,
    pub run_id: Option<RunId>,
    pub trace_id: Option<TraceId>,
    pub iteration: u32,
    pub batch: BatchPosition,
    pub metadata: MetadataMap,
}

impl ToolExecutionContext {
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
            run_id: None,
            trace_id: None,
            iteration: 0,
            batch: BatchPosition::default(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<RunId>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<TraceId>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_iteration(mut self, iteration: u32) -> Self {
        self.iteration = iteration;
        self
    }

    pub fn with_batch_position(mut self, index: usize, size: usize) -> Self {
        self.batch = BatchPosition { index, size };
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecutionResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub output: Value,
}

impl ToolExecutionResult {
    pub fn new(tool_call_id: impl Into<String>, tool_name: impl Into<String>, output: Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            output,
        }
    }

    pub fn from_call(call: &ToolCallPart, output: Value) -> Self {
        Self::new(call.id.clone(), call.name.clone(), output)
    }

    pub fn into_result_part(self) -> ToolResultPart {
        ToolResultPart::new(self.tool_call_id, self.tool_name, self.output)
    }
}
