//! Media generation contract: requests, streamed asset chunks, and the model trait.
//!
//! ```rust
//! use wprovider::{MediaChunk, PartialAssetFragment};
//!
//! let chunk = MediaChunk::default().with_partial(PartialAssetFragment::new(0, "aGk=", "image/png"));
//! assert_eq!(chunk.partial_assets.len(), 1);
//! assert!(!chunk.is_complete);
//! ```

use std::pin::Pin;

use futures_core::Stream;
use serde_json::Value;
use wcommon::{GenerationOptions, MetadataMap};

use crate::{
    DataPart, FinishReason, LinkPart, Message, ProviderError, ProviderFuture, Usage,
};

/// A progressive, base64-encoded rendition of an asset at a stable index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialAssetFragment {
    pub index: u32,
    pub base64: String,
    pub mime_type: String,
}

impl PartialAssetFragment {
    pub fn new(index: u32, base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            index,
            base64: base64.into(),
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaChunk {
    pub id: String,
    pub assets: Vec<DataPart>,
    pub links: Vec<LinkPart>,
    pub partial_assets: Vec<PartialAssetFragment>,
    pub messages: Vec<Message>,
    pub metadata: MetadataMap,
    pub finish_reason: FinishReason,
    pub usage: Option<Usage>,
    pub is_complete: bool,
}

impl MediaChunk {
    pub fn with_asset(mut self, asset: DataPart) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn with_link(mut self, link: LinkPart) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_partial(mut self, fragment: PartialAssetFragment) -> Self {
        self.partial_assets.push(fragment);
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_finish_reason(mut self, finish_reason: FinishReason) -> Self {
        self.finish_reason = finish_reason;
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn complete(mut self) -> Self {
        self.is_complete = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    pub messages: Vec<Message>,
    pub mime_types: Vec<String>,
    pub options: GenerationOptions,
    pub metadata: MetadataMap,
}

impl MediaRequest {
    pub fn new(messages: Vec<Message>, mime_types: Vec<String>) -> Self {
        Self {
            messages,
            mime_types,
            options: GenerationOptions::default(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.messages.is_empty() {
            return Err(ProviderError::invalid_request(
                "at least one message is required",
            ));
        }

        if self.mime_types.iter().any(|mime| mime.trim().is_empty()) {
            return Err(ProviderError::invalid_request("mime types must not be empty"));
        }

        Ok(())
    }
}

pub type BoxedMediaStream<'a> =
    Pin<Box<dyn Stream<Item = Result<MediaChunk, ProviderError>> + Send + 'a>>;

pub trait MediaGenerationModel: Send + Sync {
    fn name(&self) -> &str;

    fn generate<'a>(
        &'a self,
        request: MediaRequest,
    ) -> ProviderFuture<'a, Result<BoxedMediaStream<'a>, ProviderError>>;
}
