use counting_memory_cache::{MemoryCacheParams, NoOpMemoryTrimmableRegistry};
use media_variations::{
    CacheChoice, MediaVariationsIndex, MemoryMediaVariationsIndex, VariantSummary,
};

use super::*;

struct Fixture {
    pool: Arc<NativeMemoryPool>,
    cache: BitmapMemoryCache,
    index: MemoryMediaVariationsIndex<ImageCacheKey>,
    tracker: Arc<StatsTracker>,
}

impl Fixture {
    fn new() -> Self {
        let tracker = Arc::new(StatsTracker::new());

        Self {
            pool: NativeMemoryPool::new(),
            cache: bitmap_counting_memory_cache(
                MemoryCacheParams::with_max_size(10 * MB),
                &NoOpMemoryTrimmableRegistry,
                tracker.clone(),
                false,
            ),
            index: MemoryMediaVariationsIndex::new(),
            tracker,
        }
    }

    /// Caches a rendition and records it in the index.
    fn add(&self, width: u32, height: u32) -> ImageCacheKey {
        let key = ImageCacheKey::resized("media.jpg", width, height);
        let image = DecodedImage::decode(&self.pool, width, height, BitmapConfig::Argb8888);
        let summary = VariantSummary {
            width,
            height,
            size_in_bytes: width as usize * height as usize * 4,
        };

        drop(self.cache.put(key.clone(), image));
        self.index
            .save_cached_variant("m", CacheChoice::Default, key.clone(), summary);
        key
    }

    async fn find(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        find_cached_variant(&self.index, &self.cache, "m", width, height)
            .await
            .map(|image| (image.width(), image.height()))
    }
}

#[tokio::test]
async fn test_prefers_smallest_covering_variant() {
    let fixture = Fixture::new();
    fixture.add(50, 50);
    fixture.add(400, 400);
    fixture.add(200, 200);

    assert_eq!(fixture.find(100, 100).await, Some((200, 200)));
    assert_eq!(fixture.find(200, 200).await, Some((200, 200)));
    assert_eq!(fixture.find(10, 10).await, Some((50, 50)));
}

#[tokio::test]
async fn test_falls_back_to_largest_smaller_variant() {
    let fixture = Fixture::new();
    fixture.add(50, 50);
    fixture.add(120, 80);

    assert_eq!(fixture.find(500, 500).await, Some((120, 80)));
}

#[tokio::test]
async fn test_skips_variants_which_left_the_cache() {
    let fixture = Fixture::new();
    fixture.add(50, 50);
    let evicted = fixture.add(200, 200);
    fixture.cache.remove(&evicted);

    assert_eq!(fixture.find(100, 100).await, Some((50, 50)));

    fixture.cache.clear();
    assert_eq!(fixture.find(100, 100).await, None);
}

#[tokio::test]
async fn test_unknown_media_and_disabled_index() {
    let fixture = Fixture::new();
    fixture.add(50, 50);

    let found = find_cached_variant(&fixture.index, &fixture.cache, "other", 10, 10).await;
    assert!(found.is_none());

    let disabled = media_variations_index(&PipelineCacheConfig::new());
    let found = find_cached_variant(disabled.as_ref(), &fixture.cache, "m", 10, 10).await;
    assert!(found.is_none());
}

#[tokio::test]
async fn test_lookup_runs_on_another_task() {
    let fixture = Arc::new(Fixture::new());
    fixture.add(64, 64);

    let task = {
        let fixture = fixture.clone();
        tokio::spawn(async move { fixture.find(32, 32).await })
    };

    assert_eq!(task.await.unwrap(), Some((64, 64)));
}

#[tokio::test]
async fn test_variants_which_left_the_cache_are_forgotten() {
    let fixture = Fixture::new();
    for size in [20, 40, 60, 80, 100] {
        fixture.add(size, size);
    }
    assert_eq!(fixture.index.variant_count("m"), 5);

    fixture.cache.clear();
    assert_eq!(fixture.find(50, 50).await, None);

    assert_eq!(fixture.index.variant_count("m"), 0);
    assert_eq!(fixture.index.media_count(), 0);
}

#[tokio::test]
async fn test_only_stale_variants_ahead_of_the_match_are_forgotten() {
    let fixture = Fixture::new();
    let gone = fixture.add(60, 60);
    fixture.add(80, 80);
    fixture.add(20, 20);
    fixture.cache.remove(&gone);

    assert_eq!(fixture.find(50, 50).await, Some((80, 80)));
    assert_eq!(fixture.index.variant_count("m"), 2);
}

#[tokio::test]
async fn test_stale_variants_are_not_counted_as_misses() {
    let fixture = Fixture::new();
    for size in [20, 40, 60, 80, 100] {
        fixture.add(size, size);
    }
    fixture.cache.clear();

    assert_eq!(fixture.find(50, 50).await, None);
    assert_eq!(fixture.tracker.snapshot().misses, 0);

    fixture.add(70, 70);
    assert_eq!(fixture.find(50, 50).await, Some((70, 70)));

    let stats = fixture.tracker.snapshot();
    assert_eq!((stats.hits, stats.misses), (1, 0));
}
