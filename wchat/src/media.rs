//! Accumulation of streamed media generation output.
//!
//! Providers that render progressively re-send base64 fragments at a stable
//! index. [`PartialAssetTracker`] turns those into named assets: the first
//! payload at an index is `partial_<index>`, each later distinct payload is a
//! new revision `partial_<index>_<n>`, and a payload already seen at that
//! index is ignored.
//!
//! ```rust
//! use wchat::PartialAssetTracker;
//! use wprovider::PartialAssetFragment;
//!
//! let mut tracker = PartialAssetTracker::new();
//! let first = tracker.track(&PartialAssetFragment::new(0, "AQI=", "image/png"));
//! let again = tracker.track(&PartialAssetFragment::new(0, "AQI=", "image/png"));
//!
//! assert_eq!(first.and_then(|asset| asset.name).as_deref(), Some("partial_0"));
//! assert!(again.is_none());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::StreamExt;
use wcommon::MetadataMap;
use wprovider::{
    BoxedMediaStream, DataPart, FinishReason, LinkPart, MediaChunk, MediaGenerationModel,
    MediaRequest, Message, PartialAssetFragment, Usage,
};

use crate::ChatError;
use crate::accumulator::merge_metadata;

/// Length plus hash of a decoded payload; the bytes themselves are not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PayloadDigest {
    len: usize,
    hash: u64,
}

impl PayloadDigest {
    fn of(bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self {
            len: bytes.len(),
            hash: hasher.finish(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PartialAssetTracker {
    revisions: HashMap<u32, HashSet<PayloadDigest>>,
}

impl PartialAssetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the asset for a new payload, or `None` for a re-send or a
    /// payload that does not decode.
    pub fn track(&mut self, fragment: &PartialAssetFragment) -> Option<DataPart> {
        let bytes = match STANDARD.decode(fragment.base64.trim()) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(
                    index = fragment.index,
                    mime_type = %fragment.mime_type,
                    %error,
                    "dropping undecodable partial asset"
                );
                return None;
            }
        };

        let seen = self.revisions.entry(fragment.index).or_default();
        let revision = seen.len();
        if !seen.insert(PayloadDigest::of(&bytes)) {
            return None;
        }

        let name = match revision {
            0 => format!("partial_{}", fragment.index),
            revision => format!("partial_{}_{}", fragment.index, revision),
        };

        Some(DataPart::new(bytes, fragment.mime_type.clone()).with_name(name))
    }

    /// Distinct payloads seen at `index`.
    pub fn revision_count(&self, index: u32) -> usize {
        self.revisions.get(&index).map_or(0, HashSet::len)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaRunResult {
    pub assets: Vec<DataPart>,
    pub links: Vec<LinkPart>,
    pub messages: Vec<Message>,
    pub metadata: MetadataMap,
    pub usage: Option<Usage>,
    pub finish_reason: FinishReason,
    pub is_complete: bool,
}

impl MediaRunResult {
    pub fn partial_assets(&self) -> impl Iterator<Item = &DataPart> {
        self.assets.iter().filter(|asset| {
            asset
                .name
                .as_deref()
                .is_some_and(|name| name.starts_with("partial_"))
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaResultAccumulator {
    result: MediaRunResult,
    tracker: PartialAssetTracker,
}

impl MediaResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, chunk: &MediaChunk) {
        let result = &mut self.result;
        result.assets.extend(chunk.assets.iter().cloned());
        result.links.extend(chunk.links.iter().cloned());
        result.messages.extend(chunk.messages.iter().cloned());

        for fragment in &chunk.partial_assets {
            if let Some(asset) = self.tracker.track(fragment) {
                result.assets.push(asset);
            }
        }

        merge_metadata(&mut result.metadata, &chunk.metadata);

        if chunk.usage.is_some() {
            result.usage = chunk.usage;
        }

        if chunk.finish_reason.is_specified() {
            result.finish_reason = chunk.finish_reason;
            result.is_complete = true;
        }

        if chunk.is_complete {
            result.is_complete = true;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_complete
    }

    pub fn build(self) -> MediaRunResult {
        self.result
    }
}

/// Drains a media stream into its consolidated result.
pub async fn collect_media(mut stream: BoxedMediaStream<'_>) -> Result<MediaRunResult, ChatError> {
    let mut accumulator = MediaResultAccumulator::new();

    while let Some(chunk) = stream.next().await {
        accumulator.add(&chunk?);
    }

    Ok(accumulator.build())
}

/// Validates `request`, opens a generation stream, and drains it.
pub async fn generate_media(
    model: &dyn MediaGenerationModel,
    request: MediaRequest,
) -> Result<MediaRunResult, ChatError> {
    request
        .validate()
        .map_err(|error| ChatError::invalid_request(error.message))?;
    let stream = model.generate(request).await?;
    collect_media(stream).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wprovider::{ProviderError, ProviderFuture};

    use super::*;
    use crate::ChatErrorKind;

    fn fragment(index: u32, bytes: &[u8]) -> PartialAssetFragment {
        PartialAssetFragment::new(index, STANDARD.encode(bytes), "image/png")
    }

    #[test]
    fn identical_fragments_yield_one_asset() {
        let mut accumulator = MediaResultAccumulator::new();
        for _ in 0..3 {
            accumulator.add(&MediaChunk::default().with_partial(fragment(0, b"frame")));
        }

        let result = accumulator.build();
        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.assets[0].name.as_deref(), Some("partial_0"));
        assert_eq!(result.assets[0].bytes, b"frame".to_vec());
    }

    #[test]
    fn distinct_fragments_yield_revisions_per_index() {
        let mut tracker = PartialAssetTracker::new();
        let names: Vec<Option<String>> = [
            fragment(0, b"v0"),
            fragment(1, b"other"),
            fragment(0, b"v1"),
            fragment(0, b"v1"),
            fragment(0, b"v2"),
            fragment(0, b"v0"),
        ]
        .iter()
        .map(|fragment| tracker.track(fragment).and_then(|asset| asset.name))
        .collect();

        assert_eq!(
            names,
            vec![
                Some("partial_0".to_string()),
                Some("partial_1".to_string()),
                Some("partial_0_1".to_string()),
                None,
                Some("partial_0_2".to_string()),
                None,
            ]
        );
        assert_eq!(tracker.revision_count(0), 3);
    }

    #[test]
    fn large_resends_are_recognized_without_keeping_payloads() {
        let frame = vec![7u8; 64 * 1024];
        let mut touched = frame.clone();
        touched[frame.len() - 1] = 8;

        let mut tracker = PartialAssetTracker::new();
        assert!(tracker.track(&fragment(2, &frame)).is_some());
        assert!(tracker.track(&fragment(2, &frame)).is_none());
        let revision = tracker
            .track(&fragment(2, &touched))
            .expect("one changed byte is a new revision");

        assert_eq!(revision.name.as_deref(), Some("partial_2_1"));
        assert_eq!(revision.bytes, touched);
        assert_eq!(tracker.revision_count(2), 2);
        assert_eq!(PayloadDigest::of(&frame), PayloadDigest::of(&frame.clone()));
        assert_ne!(PayloadDigest::of(&frame), PayloadDigest::of(&touched));
    }

    #[test]
    fn undecodable_fragments_are_dropped() {
        let mut accumulator = MediaResultAccumulator::new();
        accumulator.add(
            &MediaChunk::default()
                .with_partial(PartialAssetFragment::new(0, "%%% not base64", "image/png"))
                .with_partial(fragment(0, b"ok")),
        );

        let result = accumulator.build();
        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.assets[0].name.as_deref(), Some("partial_0"));
    }

    #[test]
    fn completion_is_sticky_and_merge_rules_apply() {
        let mut accumulator = MediaResultAccumulator::new();
        accumulator.add(
            &MediaChunk::default()
                .with_asset(DataPart::new(vec![1], "image/png"))
                .with_metadata("steps", json!([1])),
        );
        assert!(!accumulator.is_complete());

        accumulator.add(
            &MediaChunk::default()
                .with_link(LinkPart::new("https://cdn.example/render.png"))
                .with_metadata("steps", json!([2]))
                .with_finish_reason(FinishReason::Stop),
        );
        assert!(accumulator.is_complete());

        accumulator.add(&MediaChunk::default().with_usage(Usage::new(4, 0)));
        let result = accumulator.build();

        assert!(result.is_complete);
        assert_eq!(result.finish_reason, FinishReason::Stop);
        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.links.len(), 1);
        assert_eq!(result.metadata["steps"], json!([1, 2]));
        assert_eq!(result.usage, Some(Usage::new(4, 0)));
        assert_eq!(result.partial_assets().count(), 0);
    }

    struct ProgressiveRenderer;

    impl MediaGenerationModel for ProgressiveRenderer {
        fn name(&self) -> &str {
            "renderer"
        }

        fn generate<'a>(
            &'a self,
            _request: MediaRequest,
        ) -> ProviderFuture<'a, Result<BoxedMediaStream<'a>, ProviderError>> {
            Box::pin(async move {
                let chunks: Vec<Result<MediaChunk, ProviderError>> = vec![
                    Ok(MediaChunk::default().with_partial(fragment(0, b"low"))),
                    Ok(MediaChunk::default().with_partial(fragment(0, b"low"))),
                    Ok(MediaChunk::default().with_partial(fragment(0, b"high"))),
                    Ok(MediaChunk::default()
                        .with_asset(DataPart::new(b"final".to_vec(), "image/png"))
                        .complete()),
                ];
                Ok(Box::pin(futures_util::stream::iter(chunks)) as BoxedMediaStream<'a>)
            })
        }
    }

    #[tokio::test]
    async fn generate_media_drains_the_stream() {
        let request = MediaRequest::new(vec![Message::user("a lighthouse")], vec!["image/png".into()]);
        let result = generate_media(&ProgressiveRenderer, request)
            .await
            .expect("generation should succeed");

        let names: Vec<&str> = result
            .partial_assets()
            .filter_map(|asset| asset.name.as_deref())
            .collect();
        assert_eq!(names, vec!["partial_0", "partial_0_1"]);
        assert_eq!(result.assets.len(), 3);
        assert!(result.is_complete);
    }

    #[tokio::test]
    async fn generate_media_rejects_invalid_requests() {
        let request = MediaRequest::new(Vec::new(), vec!["image/png".into()]);
        let error = generate_media(&ProgressiveRenderer, request)
            .await
            .expect_err("request should be rejected");

        assert_eq!(error.kind, ChatErrorKind::InvalidRequest);
    }
}
