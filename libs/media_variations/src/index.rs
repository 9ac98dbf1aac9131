use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use futures::future;
use parking_lot::Mutex;

use crate::variations::{
    CacheChoice, MediaVariations, MediaVariationsBuilder, Variant, VariantSummary, VariantsSource,
};

/// The type of pending variant lookups. Dropping the future cancels the
/// lookup.
pub type LookupFuture<K> = Pin<Box<dyn Future<Output = Option<MediaVariations<K>>> + Send>>;

/// Remembers which renditions of a logical piece of media have been cached,
/// so that a miss for one size can be answered with another.
///
/// The index never calls back into a cache. It is consulted by whoever
/// handles the miss.
pub trait MediaVariationsIndex<K>: Send + Sync + 'static {
    /// Looks up the variants cached for `media_id`, adding them to `builder`.
    /// Resolves to [`None`] when nothing is known about the media.
    fn cached_variants(&self, media_id: &str, builder: MediaVariationsBuilder<K>)
        -> LookupFuture<K>;

    /// Records that the variant stored under `key` has been cached.
    fn save_cached_variant(
        &self,
        media_id: &str,
        cache_choice: CacheChoice,
        key: K,
        summary: VariantSummary,
    );

    /// Records that the variant stored under `key` is no longer cached.
    fn remove_cached_variant(&self, _media_id: &str, _key: &K) {}
}

/// An index which knows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMediaVariationsIndex;

impl<K> MediaVariationsIndex<K> for NoOpMediaVariationsIndex
where
    K: Send + 'static,
{
    fn cached_variants(
        &self,
        _media_id: &str,
        _builder: MediaVariationsBuilder<K>,
    ) -> LookupFuture<K> {
        Box::pin(future::ready(None))
    }

    fn save_cached_variant(
        &self,
        _media_id: &str,
        _cache_choice: CacheChoice,
        _key: K,
        _summary: VariantSummary,
    ) {
    }
}

/// An index kept in process memory. Each key is recorded at most once per
/// media id; saving it again replaces the earlier record.
///
/// Records are dropped when a lookup reports their key gone from the cache,
/// and a media id goes away with its last variant.
pub struct MemoryMediaVariationsIndex<K> {
    variants: Mutex<HashMap<String, Vec<Variant<K>>>>,
}

impl<K> MemoryMediaVariationsIndex<K> {
    pub fn new() -> Self {
        Self {
            variants: Mutex::new(HashMap::new()),
        }
    }

    /// Number of media ids with at least one recorded variant.
    pub fn media_count(&self) -> usize {
        self.variants.lock().len()
    }

    /// Number of variants recorded for `media_id`.
    pub fn variant_count(&self, media_id: &str) -> usize {
        self.variants.lock().get(media_id).map_or(0, Vec::len)
    }

    /// Forgets everything recorded for `media_id`.
    pub fn forget(&self, media_id: &str) -> bool {
        self.variants.lock().remove(media_id).is_some()
    }
}

impl<K> Default for MemoryMediaVariationsIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> MediaVariationsIndex<K> for MemoryMediaVariationsIndex<K>
where
    K: Clone + PartialEq + Send + Sync + 'static,
{
    fn cached_variants(
        &self,
        media_id: &str,
        builder: MediaVariationsBuilder<K>,
    ) -> LookupFuture<K> {
        // Copy out under the lock so the future owns everything it needs.
        let found = self.variants.lock().get(media_id).cloned();

        let Some(found) = found else {
            return Box::pin(future::ready(None));
        };

        Box::pin(async move {
            let mut builder = builder.source(VariantsSource::Index);

            for variant in found {
                if !builder.has_variant(&variant.key) {
                    builder = builder.add_variant(
                        variant.key,
                        variant.width,
                        variant.height,
                        variant.cache_choice,
                    );
                }
            }

            Some(builder.build())
        })
    }

    fn save_cached_variant(
        &self,
        media_id: &str,
        cache_choice: CacheChoice,
        key: K,
        summary: VariantSummary,
    ) {
        let variant = Variant {
            key,
            width: summary.width,
            height: summary.height,
            cache_choice,
        };

        let mut variants = self.variants.lock();
        let recorded = variants.entry(media_id.to_owned()).or_default();

        match recorded.iter_mut().find(|v| v.key == variant.key) {
            Some(existing) => *existing = variant,
            None => recorded.push(variant),
        }

        tracing::debug!(
            media_id,
            variants = recorded.len(),
            size_in_bytes = summary.size_in_bytes,
            "recorded cached variant"
        );
    }

    fn remove_cached_variant(&self, media_id: &str, key: &K) {
        let mut variants = self.variants.lock();
        let Some(recorded) = variants.get_mut(media_id) else {
            return;
        };

        recorded.retain(|v| v.key != *key);
        let remaining = recorded.len();
        if remaining == 0 {
            variants.remove(media_id);
        }

        tracing::debug!(media_id, remaining, "removed stale variant");
    }
}
