//! Run request, streaming chunk, and consolidated result types.

use std::pin::Pin;

use futures_core::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use wcommon::{GenerationOptions, MetadataMap, RunId, SessionId, TraceId};
use wprovider::{FinishReason, Message, Role, Usage};

use crate::ChatError;

/// Metadata key carrying the text a suppressed phase produced.
pub const SUPPRESSED_TEXT_KEY: &str = "suppressed_text";

/// Metadata key carrying the suppressed phase's metadata and tool calls.
pub const SUPPRESSED_TOOL_CALLS_KEY: &str = "suppressed_tool_calls";

/// Metadata key carrying the reasoning a suppressed phase produced.
pub const SUPPRESSED_THINKING_KEY: &str = "suppressed_thinking";

/// Metadata key set on the final chunk when the iteration ceiling stopped a run.
pub const ITERATION_LIMIT_KEY: &str = "iteration_limit_reached";

#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub session_id: SessionId,
    pub run_id: RunId,
    pub trace_id: Option<TraceId>,
    pub history: Vec<Message>,
    pub prompt: Option<Message>,
    pub output_schema: Option<Value>,
    pub options: GenerationOptions,
    pub metadata: MetadataMap,
    pub tools_enabled: bool,
}

impl RunRequest {
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        let session_id = session_id.into();
        Self {
            run_id: RunId::new(format!("{session_id}-run")),
            session_id,
            trace_id: None,
            history: Vec::new(),
            prompt: None,
            output_schema: None,
            options: GenerationOptions::default(),
            metadata: MetadataMap::new(),
            tools_enabled: true,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<RunId>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<TraceId>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_history(mut self, history: impl IntoIterator<Item = Message>) -> Self {
        self.history = history.into_iter().collect();
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(Message::user(prompt));
        self
    }

    pub fn with_prompt_message(mut self, prompt: Message) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Runs without advertising tools even when the orchestrator has some.
    pub fn without_tools(mut self) -> Self {
        self.tools_enabled = false;
        self
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        if self.history.is_empty() && self.prompt.is_none() {
            return Err(ChatError::invalid_request(
                "run requires history or a prompt",
            ));
        }

        if let Some(prompt) = &self.prompt
            && prompt.parts.is_empty()
        {
            return Err(ChatError::invalid_request("prompt must not be empty"));
        }

        if let Some(schema) = &self.output_schema
            && !schema.is_object()
        {
            return Err(ChatError::invalid_request(
                "output schema must be a JSON object",
            ));
        }

        if let Some(reason) = self.options.check() {
            return Err(ChatError::invalid_request(reason));
        }

        Ok(())
    }

    /// Caller history followed by the prompt, if any.
    pub fn initial_history(&self) -> Vec<Message> {
        let mut history = self.history.clone();
        history.extend(self.prompt.clone());
        history
    }
}

/// One unit surfaced to the caller while a run progresses.
///
/// `messages` holds only the history entries appended while producing this
/// chunk; concatenated across a run they equal the run's new history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamingChunk {
    pub id: String,
    pub output_text: String,
    pub messages: Vec<Message>,
    pub thinking: Option<String>,
    pub finish_reason: FinishReason,
    pub metadata: MetadataMap,
    pub usage: Option<Usage>,
}

impl StreamingChunk {
    pub fn text(output_text: impl Into<String>) -> Self {
        Self {
            output_text: output_text.into(),
            ..Self::default()
        }
    }

    pub fn message(message: Message) -> Self {
        Self {
            messages: vec![message],
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_thinking(mut self, thinking: impl Into<String>) -> Self {
        self.thinking = Some(thinking.into());
        self
    }

    pub fn with_finish_reason(mut self, finish_reason: FinishReason) -> Self {
        self.finish_reason = finish_reason;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

pub type ChatChunkStream<'a> =
    Pin<Box<dyn Stream<Item = Result<StreamingChunk, ChatError>> + Send + 'a>>;

/// Everything a run surfaced, consolidated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatRunResult {
    pub output_text: String,
    pub messages: Vec<Message>,
    pub thinking: Option<String>,
    pub metadata: MetadataMap,
    pub usage: Option<Usage>,
    pub finish_reason: FinishReason,
}

impl ChatRunResult {
    pub fn iteration_limit_reached(&self) -> bool {
        self.metadata
            .get(ITERATION_LIMIT_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// The last model-authored message of the run.
    pub fn final_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Model)
    }

    /// Text a suppressed phase produced, from the final message or, when the
    /// run stopped before that message existed, from the run metadata.
    pub fn suppressed_text(&self) -> Option<&str> {
        self.final_message()
            .and_then(|message| message.metadata.get(SUPPRESSED_TEXT_KEY))
            .or_else(|| self.metadata.get(SUPPRESSED_TEXT_KEY))
            .and_then(Value::as_str)
    }

    /// Parses the final model message text (or the streamed text when the run
    /// produced no model message) as `T`.
    pub fn parse_output<T>(&self) -> Result<T, ChatError>
    where
        T: DeserializeOwned,
    {
        let text = match self.final_message() {
            Some(message) if !message.text().trim().is_empty() => message.text(),
            _ => self.output_text.clone(),
        };

        serde_json::from_str(strip_code_fence(&text))
            .map_err(|err| ChatError::output(format!("structured output did not parse: {err}")))
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.strip_suffix("```").unwrap_or(body).trim()
}
