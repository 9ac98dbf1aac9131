use std::sync::Arc;

use media_variations::{MediaVariationsIndex, MemoryMediaVariationsIndex, NoOpMediaVariationsIndex};

use crate::key::ImageCacheKey;

/// Toggles for the pipeline's caching layer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineCacheConfig {
    /// Log bitmaps which enter the decoded cache without having been decoded
    /// by the pipeline.
    pub external_created_bitmap_log_enabled: bool,

    /// Record cached variants, so misses can fall back to other sizes.
    pub media_variations_index_enabled: bool,
}

impl PipelineCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_external_created_bitmap_log(mut self, enabled: bool) -> Self {
        self.external_created_bitmap_log_enabled = enabled;
        self
    }

    pub fn with_media_variations_index(mut self, enabled: bool) -> Self {
        self.media_variations_index_enabled = enabled;
        self
    }
}

pub fn media_variations_index(
    config: &PipelineCacheConfig,
) -> Arc<dyn MediaVariationsIndex<ImageCacheKey>> {
    if config.media_variations_index_enabled {
        Arc::new(MemoryMediaVariationsIndex::new())
    } else {
        Arc::new(NoOpMediaVariationsIndex)
    }
}
