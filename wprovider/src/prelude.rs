//! Common `wprovider` imports for downstream crates.

pub use crate::{
    BoxedChunkStream, ChatModel, DataPart, FinishReason, LinkPart, Message, ModelCapabilities,
    ModelChunk, ModelRequest, Part, ProviderError, ProviderErrorKind, ProviderFuture,
    ProviderOperationHooks, RetryPolicy, RetryingChatModel, Role, ToolCallPart, ToolDefinition,
    ToolResultPart, Usage, VecChunkStream,
};
pub use wcommon::{BoxFuture, GenerationOptions, MetadataMap};
