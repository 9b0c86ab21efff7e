//! Streaming chunk contracts and in-memory stream utilities.
//!
//! ```rust
//! use wprovider::{BoxedChunkStream, FinishReason, ModelChunk, VecChunkStream};
//!
//! let stream = VecChunkStream::new(vec![
//!     Ok(ModelChunk::text("hello")),
//!     Ok(ModelChunk::text(" world").with_finish_reason(FinishReason::Stop)),
//! ]);
//! let _boxed: BoxedChunkStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use serde_json::Value;
use wcommon::MetadataMap;

use crate::{FinishReason, Message, Part, ProviderError, Usage};

/// One incremental unit emitted by a chat model.
///
/// `delta` holds only the parts produced since the previous chunk; the
/// consumer is responsible for folding deltas into a full message.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelChunk {
    pub id: String,
    pub delta: Message,
    pub thinking: Option<String>,
    pub finish_reason: FinishReason,
    pub metadata: MetadataMap,
    pub usage: Option<Usage>,
}

impl Default for ModelChunk {
    fn default() -> Self {
        Self {
            id: String::new(),
            delta: Message::empty_model(),
            thinking: None,
            finish_reason: FinishReason::Unspecified,
            metadata: MetadataMap::new(),
            usage: None,
        }
    }
}

impl ModelChunk {
    pub fn new(delta: Message) -> Self {
        Self {
            delta,
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Message::model(text))
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self::new(Message::empty_model().with_part(Part::tool_call(id, name, arguments)))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.delta.parts.push(part);
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

    /// Text carried by this chunk's delta.
    pub fn text_delta(&self) -> String {
        self.delta.text()
    }
}

/// Chat model stream contract.
///
/// Invariants for consumers:
/// - Chunks are emitted in source order.
/// - A transport failure is yielded as an `Err` item and ends the stream.
/// - Once the stream yields `None`, it must not yield additional items.
pub trait ModelChunkStream: Stream<Item = Result<ModelChunk, ProviderError>> + Send {}

impl<T> ModelChunkStream for T where T: Stream<Item = Result<ModelChunk, ProviderError>> + Send {}

pub type BoxedChunkStream<'a> = Pin<Box<dyn ModelChunkStream + 'a>>;

#[derive(Debug)]
pub struct VecChunkStream {
    chunks: VecDeque<Result<ModelChunk, ProviderError>>,
}

impl VecChunkStream {
    pub fn new(chunks: Vec<Result<ModelChunk, ProviderError>>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

impl Stream for VecChunkStream {
    type Item = Result<ModelChunk, ProviderError>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.chunks.pop_front())
    }
}
