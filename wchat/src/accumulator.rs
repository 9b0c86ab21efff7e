//! Accumulators folding streamed pieces into consolidated values.
//!
//! [`ChatResultAccumulator`] folds the chunks a run surfaces into a
//! [`ChatRunResult`]; [`MessageAccumulator`] folds a model's partial deltas
//! into the single message that goes into history.
//!
//! ```rust
//! use serde_json::json;
//! use wchat::{ChatResultAccumulator, StreamingChunk};
//!
//! let mut accumulator = ChatResultAccumulator::new();
//! accumulator.add(&StreamingChunk::text("Hel").with_metadata("tags", json!(["a"])));
//! accumulator.add(&StreamingChunk::text("lo").with_metadata("tags", json!(["b"])));
//!
//! let result = accumulator.build();
//! assert_eq!(result.output_text, "Hello");
//! assert_eq!(result.metadata["tags"], json!(["a", "b"]));
//! ```

use std::collections::HashMap;

use serde_json::Value;
use wcommon::MetadataMap;
use wprovider::{FinishReason, Message, ModelChunk, Part, Role, ToolCallPart, Usage};

use crate::{ChatRunResult, StreamingChunk};

/// Merges `incoming` into `target` key by key.
///
/// Lists concatenate, maps merge recursively with incoming keys winning on
/// collision, and every other combination is replaced by the incoming value.
pub fn merge_metadata(target: &mut MetadataMap, incoming: &MetadataMap) {
    for (key, value) in incoming {
        match target.get_mut(key) {
            Some(existing) => merge_value(existing, value),
            None => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn merge_value(existing: &mut Value, incoming: &Value) {
    match (existing, incoming) {
        (Value::Array(current), Value::Array(more)) => current.extend(more.iter().cloned()),
        (Value::Object(current), Value::Object(more)) => merge_metadata(current, more),
        (slot, value) => *slot = value.clone(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatResultAccumulator {
    output_text: String,
    messages: Vec<Message>,
    thinking: Option<String>,
    metadata: MetadataMap,
    usage: Option<Usage>,
    finish_reason: FinishReason,
    chunks: usize,
}

impl ChatResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests one chunk; chunks must arrive in emission order.
    pub fn add(&mut self, chunk: &StreamingChunk) {
        self.chunks += 1;
        self.output_text.push_str(&chunk.output_text);
        self.messages.extend(chunk.messages.iter().cloned());

        if let Some(thinking) = &chunk.thinking {
            self.thinking
                .get_or_insert_with(String::new)
                .push_str(thinking);
        }

        merge_metadata(&mut self.metadata, &chunk.metadata);

        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }

        if chunk.finish_reason.is_specified() {
            self.finish_reason = chunk.finish_reason;
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn output_text(&self) -> &str {
        &self.output_text
    }

    pub fn build(self) -> ChatRunResult {
        ChatRunResult {
            output_text: self.output_text,
            messages: self.messages,
            thinking: self.thinking,
            metadata: self.metadata,
            usage: self.usage,
            finish_reason: self.finish_reason,
        }
    }
}

/// Folds partial model deltas into one model message.
#[derive(Debug, Clone, Default)]
pub struct MessageAccumulator {
    parts: Vec<Part>,
    tool_call_positions: HashMap<String, usize>,
    metadata: MetadataMap,
    thinking: Option<String>,
    finish_reason: FinishReason,
    usage: Option<Usage>,
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chunk(&mut self, chunk: &ModelChunk) {
        self.push_delta(&chunk.delta);
        merge_metadata(&mut self.metadata, &chunk.metadata);

        if let Some(thinking) = &chunk.thinking {
            self.thinking
                .get_or_insert_with(String::new)
                .push_str(thinking);
        }

        if chunk.finish_reason.is_specified() {
            self.finish_reason = chunk.finish_reason;
        }

        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }
    }

    pub fn push_delta(&mut self, delta: &Message) {
        for part in &delta.parts {
            self.push_part(part);
        }
        merge_metadata(&mut self.metadata, &delta.metadata);
    }

    fn push_part(&mut self, part: &Part) {
        match part {
            Part::Text { text } => {
                if let Some(Part::Text { text: last }) = self.parts.last_mut() {
                    last.push_str(text);
                } else {
                    self.parts.push(part.clone());
                }
            }
            Part::ToolCall(call) => self.push_tool_call(call),
            _ => self.parts.push(part.clone()),
        }
    }

    fn push_tool_call(&mut self, call: &ToolCallPart) {
        if call.id.is_empty() {
            self.parts.push(Part::ToolCall(call.clone()));
            return;
        }

        if let Some(&position) = self.tool_call_positions.get(&call.id)
            && let Some(Part::ToolCall(existing)) = self.parts.get_mut(position)
        {
            if !call.arguments.is_null() {
                existing.arguments = call.arguments.clone();
            }
            if existing.name.is_empty() {
                existing.name = call.name.clone();
            }
            return;
        }

        self.tool_call_positions
            .insert(call.id.clone(), self.parts.len());
        self.parts.push(Part::ToolCall(call.clone()));
    }

    /// Text accumulated so far.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    pub fn thinking(&self) -> Option<&str> {
        self.thinking.as_deref()
    }

    pub fn finish_reason(&self) -> FinishReason {
        self.finish_reason
    }

    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.metadata.is_empty()
    }

    /// Builds the consolidated model message and resets the accumulator.
    ///
    /// Tool calls without an id receive `call_<iteration>_<index>`, where
    /// `index` counts tool calls within the message.
    pub fn consolidate(&mut self, iteration: u32) -> Message {
        let accumulated = std::mem::take(self);
        let mut tool_index = 0usize;
        let mut parts = Vec::with_capacity(accumulated.parts.len());

        for part in accumulated.parts {
            match part {
                Part::Text { text } if text.is_empty() => {}
                Part::ToolCall(mut call) => {
                    if call.id.is_empty() {
                        call.id = format!("call_{iteration}_{tool_index}");
                    }
                    tool_index += 1;
                    parts.push(Part::ToolCall(call));
                }
                other => parts.push(other),
            }
        }

        Message {
            role: Role::Model,
            parts,
            metadata: accumulated.metadata,
        }
    }
}
