//! Chat model contract, message model, and streaming chunk types.
//!
//! Transports for individual providers implement [`ChatModel`]; everything
//! above this crate speaks only in [`Message`], [`Part`], and [`ModelChunk`].

mod error;
mod media;
mod model;
mod provider;
mod resilience;
mod stream;

pub mod prelude;

pub use error::{ProviderError, ProviderErrorKind};
pub use media::{
    BoxedMediaStream, MediaChunk, MediaGenerationModel, MediaRequest, PartialAssetFragment,
};
pub use model::{
    DataPart, FinishReason, LinkPart, Message, ModelRequest, ModelRequestBuilder, Part, Role,
    ToolCallPart, ToolDefinition, ToolResultPart, Usage,
};
pub use provider::{ChatModel, ModelCapabilities, ProviderFuture};
pub use resilience::{
    NoopOperationHooks, ProviderOperationHooks, RetryPolicy, RetryingChatModel, execute_with_retry,
};
pub use stream::{BoxedChunkStream, ModelChunk, ModelChunkStream, VecChunkStream};
