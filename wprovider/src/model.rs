//! Provider-agnostic message, part, and request types.
//!
//! ```rust
//! use wprovider::{Message, ModelRequest, Part, ProviderErrorKind, Role};
//!
//! let message = Message::user("Summarize this diff");
//! assert_eq!(message.role, Role::User);
//! assert_eq!(message.text(), "Summarize this diff");
//! assert!(matches!(message.parts[0], Part::Text { .. }));
//!
//! let ok = ModelRequest::builder().message(message).build();
//! assert!(ok.is_ok());
//!
//! let err = ModelRequest::builder().build().err().expect("empty history should fail");
//! assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wcommon::{GenerationOptions, MetadataMap};

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPart {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub name: Option<String>,
}

impl DataPart {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPart {
    pub uri: String,
    pub mime_type: Option<String>,
    pub name: Option<String>,
}

impl LinkPart {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: None,
            name: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPart {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCallPart {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultPart {
    pub id: String,
    pub name: String,
    pub result: Value,
}

impl ToolResultPart {
    pub fn new(id: impl Into<String>, name: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            result,
        }
    }

    /// True when the result carries the structured `{"error": ...}` payload.
    pub fn is_error(&self) -> bool {
        self.result
            .as_object()
            .is_some_and(|object| object.contains_key("error"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    Data(DataPart),
    Link(LinkPart),
    ToolCall(ToolCallPart),
    ToolResult(ToolResultPart),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCall(ToolCallPart::new(id, name, arguments))
    }

    pub fn tool_result(id: impl Into<String>, name: impl Into<String>, result: Value) -> Self {
        Self::ToolResult(ToolResultPart::new(id, name, result))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCallPart> {
        match self {
            Self::ToolCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolResultPart> {
        match self {
            Self::ToolResult(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "MetadataMap::is_empty")]
    pub metadata: MetadataMap,
}

impl Message {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            role,
            parts,
            metadata: MetadataMap::new(),
        }
    }

    pub fn from_text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![Part::text(text)])
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::from_text(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::from_text(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::from_text(Role::Model, text)
    }

    /// A model message with no parts, used as the seed for streamed deltas.
    pub fn empty_model() -> Self {
        Self::new(Role::Model, Vec::new())
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Concatenation of every text part, in order.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallPart> {
        self.parts.iter().filter_map(Part::as_tool_call)
    }

    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResultPart> {
        self.parts.iter().filter_map(Part::as_tool_result)
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls().next().is_some()
    }

    /// A model turn that produced nothing actionable: no tool calls, no
    /// non-whitespace text, and no data or link content.
    pub fn is_empty_response(&self) -> bool {
        self.parts.iter().all(|part| match part {
            Part::Text { text } => text.trim().is_empty(),
            Part::ToolCall(_) | Part::Data(_) | Part::Link(_) => false,
            Part::ToolResult(_) => true,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Unspecified,
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Recitation,
}

impl FinishReason {
    pub fn is_specified(self) -> bool {
        self != Self::Unspecified
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub response_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, response_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            response_tokens,
            total_tokens: prompt_tokens + response_tokens,
        }
    }
}

/// One call into a chat model: history plus whatever capabilities the
/// current orchestration phase enables.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub output_schema: Option<Value>,
    pub options: GenerationOptions,
    pub metadata: MetadataMap,
}

impl ModelRequest {
    pub fn builder() -> ModelRequestBuilder {
        ModelRequestBuilder::default()
    }

    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            output_schema: None,
            options: GenerationOptions::default(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    pub fn has_output_schema(&self) -> bool {
        self.output_schema.is_some()
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.messages.is_empty() {
            return Err(ProviderError::invalid_request(
                "at least one message is required",
            ));
        }

        if let Some(problem) = self.options.check() {
            return Err(ProviderError::invalid_request(problem));
        }

        let mut seen = HashSet::new();
        for tool in &self.tools {
            if tool.name.trim().is_empty() {
                return Err(ProviderError::invalid_request("tool names must not be empty"));
            }

            if !seen.insert(tool.name.as_str()) {
                return Err(ProviderError::invalid_request(format!(
                    "duplicate tool definition '{}'",
                    tool.name
                )));
            }
        }

        if let Some(schema) = &self.output_schema
            && !schema.is_object()
        {
            return Err(ProviderError::invalid_request(
                "output schema must be a JSON object",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelRequestBuilder {
    messages: Vec<Message>,
    tools: Vec<ToolDefinition>,
    output_schema: Option<Value>,
    options: GenerationOptions,
    metadata: MetadataMap,
}

impl ModelRequestBuilder {
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<ModelRequest, ProviderError> {
        let request = ModelRequest {
            messages: self.messages,
            tools: self.tools,
            output_schema: self.output_schema,
            options: self.options,
            metadata: self.metadata,
        };

        request.validate()?;
        Ok(request)
    }
}
