use counting_memory_cache::{CacheKey, CacheRef, CachedValue, CountingMemoryCache};
use media_variations::{MediaVariations, MediaVariationsIndex, Variant};

/// Answers a miss for `media_id` at `width` by `height` with another cached
/// rendition of the same media.
///
/// The smallest variant at least as large as the request is preferred, since
/// it can be scaled down without losing quality. Failing that, the largest
/// smaller variant is used. Variants the index knows about but which have
/// since left the cache are skipped and removed from the index. Only the
/// variant found counts towards the cache's statistics.
pub async fn find_cached_variant<I, K, V>(
    index: &I,
    cache: &CountingMemoryCache<K, V>,
    media_id: &str,
    width: u32,
    height: u32,
) -> Option<CacheRef<K, V>>
where
    I: MediaVariationsIndex<K> + ?Sized,
    K: CacheKey,
    V: CachedValue,
{
    let variations = index
        .cached_variants(media_id, MediaVariations::builder(media_id))
        .await?;

    let mut candidates = variations.variants().iter().collect::<Vec<_>>();
    candidates.sort_by_key(|variant| preference(variant, width, height));

    let found = candidates.into_iter().find_map(|variant| {
        let found = cache.try_get(&variant.key);
        if found.is_none() {
            index.remove_cached_variant(media_id, &variant.key);
        }
        found
    });

    tracing::debug!(media_id, width, height, hit = found.is_some(), "variant lookup");
    found
}

fn preference<K>(variant: &Variant<K>, width: u32, height: u32) -> (bool, u64) {
    if variant.covers(width, height) {
        (false, variant.area())
    } else {
        (true, u64::MAX - variant.area())
    }
}
