use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use counting_memory_cache::{CacheRef, CachedValue};
use image_cache::{fallback, BitmapConfig, DecodedImage, ImageCacheKey, PooledByteBuffer, KB};
use media_variations::{CacheChoice, VariantSummary};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Pipeline;

/// Sizes views ask for.
const SIZES: [(u32, u32); 4] = [(48, 48), (96, 96), (160, 120), (320, 240)];

type ImageRef = CacheRef<ImageCacheKey, DecodedImage>;

/// One client: requests random images, holds each across a yield point as a
/// view would while drawing, then lets go.
pub(crate) async fn run(pipeline: Arc<Pipeline>, seed: u64, operations: usize, keyspace: usize) {
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..operations {
        let media_id = format!("media-{}", rng.gen_range(0..keyspace));
        let (width, height) = SIZES[rng.gen_range(0..SIZES.len())];
        let uri = format!("https://images.test/{media_id}.jpg");
        let key = ImageCacheKey::resized(uri, width, height);

        let image = match pipeline.bitmaps.get(&key) {
            Some(image) => Some(image),
            None => pipeline.load(&mut rng, &media_id, key, width, height).await,
        };

        let Some(image) = image else {
            continue;
        };

        tokio::task::yield_now().await;

        if !image.is_valid() {
            tracing::error!(key = %image.key(), "handle points at a disposed image");
            pipeline.invalid_handles.fetch_add(1, Ordering::Relaxed);
        }
    }

    tracing::debug!(seed, operations, "client finished");
}

impl Pipeline {
    /// Handles a decoded cache miss: a cached variant if there is one,
    /// otherwise decode from the encoded cache, fetching on a second miss.
    async fn load(
        &self,
        rng: &mut StdRng,
        media_id: &str,
        key: ImageCacheKey,
        width: u32,
        height: u32,
    ) -> Option<ImageRef> {
        if self.variations {
            let variant = fallback::find_cached_variant(
                self.index.as_ref(),
                &self.bitmaps,
                media_id,
                width,
                height,
            )
            .await;

            if variant.is_some() {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                return variant;
            }
        }

        let source = ImageCacheKey::new(key.uri());
        let encoded = match self.encoded.get(&source) {
            Some(encoded) => Some(encoded),
            None => self.fetch(rng, source),
        };
        tracing::trace!(
            key = %key,
            encoded_bytes = encoded.as_ref().map(|buffer| buffer.len()),
            "decoding"
        );
        drop(encoded);

        let image = self.decode(rng, &key, width, height);
        let image = self.bitmaps.put(key.clone(), image)?;

        self.index.save_cached_variant(
            media_id,
            CacheChoice::Default,
            key,
            VariantSummary {
                width,
                height,
                size_in_bytes: image.size_in_bytes(),
            },
        );

        Some(image)
    }

    fn fetch(
        &self,
        rng: &mut StdRng,
        source: ImageCacheKey,
    ) -> Option<CacheRef<ImageCacheKey, PooledByteBuffer>> {
        let len = rng.gen_range(2 * KB..96 * KB);
        let buffer = PooledByteBuffer::new(&self.pool, Bytes::from(vec![0u8; len]));

        self.encoded.put(source, buffer)
    }

    fn decode(
        &self,
        rng: &mut StdRng,
        key: &ImageCacheKey,
        width: u32,
        height: u32,
    ) -> DecodedImage {
        if rng.gen_bool(0.02) {
            return DecodedImage::external(&self.pool, width, height, BitmapConfig::Argb8888);
        }

        // Another size of the same image nobody is looking at can donate its
        // pixel memory.
        if rng.gen_bool(0.1) {
            let (other_width, other_height) = SIZES[rng.gen_range(0..SIZES.len())];
            let donor = ImageCacheKey::resized(key.uri(), other_width, other_height);

            if donor != *key {
                if let Some(image) = self.bitmaps.reuse(&donor) {
                    match image.reconfigure(width, height, BitmapConfig::Argb8888) {
                        Ok(image) => return image,
                        Err(image) => {
                            if let Err(error) = image.dispose() {
                                tracing::warn!(%error, "failed to dispose unusable donor image");
                            }
                        }
                    }
                }
            }
        }

        DecodedImage::decode(&self.pool, width, height, BitmapConfig::Argb8888)
    }
}
