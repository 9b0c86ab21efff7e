//! Chat model contract consumed by the orchestration layer.
//!
//! ```rust
//! use wprovider::ModelCapabilities;
//!
//! let caps = ModelCapabilities::tools_xor_schema();
//! assert!(caps.tools && caps.output_schema);
//! assert!(!caps.tools_with_output_schema);
//! ```

use wcommon::BoxFuture;

use crate::{BoxedChunkStream, ModelRequest, ProviderError};

pub type ProviderFuture<'a, T> = BoxFuture<'a, T>;

/// What a chat model backend accepts in a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelCapabilities {
    pub tools: bool,
    pub output_schema: bool,
    pub tools_with_output_schema: bool,
}

impl ModelCapabilities {
    pub fn text_only() -> Self {
        Self::default()
    }

    /// Tools and structured output, including both in one request.
    pub fn full() -> Self {
        Self {
            tools: true,
            output_schema: true,
            tools_with_output_schema: true,
        }
    }

    /// Tools and structured output, but never in the same request.
    pub fn tools_xor_schema() -> Self {
        Self {
            tools: true,
            output_schema: true,
            tools_with_output_schema: false,
        }
    }

    pub fn with_tools(mut self) -> Self {
        self.tools = true;
        self
    }

    pub fn with_output_schema(mut self) -> Self {
        self.output_schema = true;
        self
    }

    /// Checks a single request against these capabilities.
    pub fn check(&self, request: &ModelRequest) -> Result<(), ProviderError> {
        if request.has_tools() && !self.tools {
            return Err(ProviderError::unsupported("model does not support tools"));
        }

        if request.has_output_schema() && !self.output_schema {
            return Err(ProviderError::unsupported(
                "model does not support structured output",
            ));
        }

        if request.has_tools() && request.has_output_schema() && !self.tools_with_output_schema {
            return Err(ProviderError::unsupported(
                "model cannot combine tools and structured output in one request",
            ));
        }

        Ok(())
    }
}

pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> ModelCapabilities;

    /// Opens a streaming call. May be invoked repeatedly with growing history.
    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>>;

    /// Releases transport resources held by the model.
    fn dispose(&self) {}
}
