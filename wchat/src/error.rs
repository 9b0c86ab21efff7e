//! Chat-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use wprovider::ProviderError;
use wtooling::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    Configuration,
    Provider,
    Tooling,
    Output,
}

/// Where in a run the error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorPhase {
    Setup,
    ModelCall,
    Streaming,
    ToolExecution,
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    pub retryable: bool,
    pub phase: Option<ChatErrorPhase>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: false,
            phase: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Configuration, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Provider, message)
    }

    pub fn tooling(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Tooling, message)
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Output, message)
    }

    pub fn with_phase(mut self, phase: ChatErrorPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            ChatErrorKind::InvalidRequest | ChatErrorKind::Configuration
        )
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.phase {
            Some(phase) => write!(f, "{:?} during {:?}: {}", self.kind, phase, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        let retryable = value.retryable;
        let mut error = ChatError::provider(value.to_string());
        error.retryable = retryable;
        error
    }
}

impl From<ToolError> for ChatError {
    fn from(value: ToolError) -> Self {
        let retryable = value.is_retryable();
        let mut error = ChatError::tooling(value.to_string());
        error.retryable = retryable;
        error
    }
}
