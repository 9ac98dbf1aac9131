use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use counting_memory_cache::{CachedValue, DisposeError};

use crate::pool::{NativeAllocation, NativeMemoryPool};

/// Pixel layouts a decoded image may use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitmapConfig {
    #[default]
    Argb8888,
    Rgb565,
    Alpha8,
}

impl BitmapConfig {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Argb8888 => 4,
            Self::Rgb565 => 2,
            Self::Alpha8 => 1,
        }
    }
}

/// A decoded bitmap whose pixels live in native memory.
#[derive(Debug)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    config: BitmapConfig,
    allocation: NativeAllocation,
    disposed: AtomicBool,
    externally_created: bool,
}

impl DecodedImage {
    /// Allocates pixel memory for an image the pipeline decoded itself.
    pub fn decode(
        pool: &Arc<NativeMemoryPool>,
        width: u32,
        height: u32,
        config: BitmapConfig,
    ) -> Self {
        Self::allocate(pool, width, height, config, false)
    }

    /// Wraps a bitmap created outside of the pipeline, such as one drawn by
    /// the application.
    pub fn external(
        pool: &Arc<NativeMemoryPool>,
        width: u32,
        height: u32,
        config: BitmapConfig,
    ) -> Self {
        Self::allocate(pool, width, height, config, true)
    }

    fn allocate(
        pool: &Arc<NativeMemoryPool>,
        width: u32,
        height: u32,
        config: BitmapConfig,
        externally_created: bool,
    ) -> Self {
        Self {
            width,
            height,
            config,
            allocation: pool.allocate(byte_count(width, height, config)),
            disposed: AtomicBool::new(false),
            externally_created,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn config(&self) -> BitmapConfig {
        self.config
    }

    pub fn is_externally_created(&self) -> bool {
        self.externally_created
    }

    /// Frees the pixel memory without going through the cache. A cache still
    /// holding the image will fail to dispose it later.
    pub fn recycle(&self) -> Result<(), DisposeError> {
        self.allocation.release()
    }

    /// Whether the pixel memory is large enough to hold an image of the given
    /// dimensions.
    pub fn can_reuse_for(&self, width: u32, height: u32, config: BitmapConfig) -> bool {
        self.is_valid() && byte_count(width, height, config) <= self.allocation.size_in_bytes()
    }

    /// Reuses the pixel memory for a new image of the given dimensions. Hands
    /// the image back unchanged if it does not fit.
    pub fn reconfigure(
        mut self,
        width: u32,
        height: u32,
        config: BitmapConfig,
    ) -> Result<Self, Self> {
        if !self.can_reuse_for(width, height, config) {
            return Err(self);
        }

        self.width = width;
        self.height = height;
        self.config = config;
        Ok(self)
    }
}

impl CachedValue for DecodedImage {
    fn size_in_bytes(&self) -> usize {
        byte_count(self.width, self.height, self.config)
    }

    fn is_valid(&self) -> bool {
        !self.disposed.load(Ordering::Acquire) && !self.allocation.is_released()
    }

    fn dispose(&self) -> Result<(), DisposeError> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.allocation.release()
    }
}

fn byte_count(width: u32, height: u32, config: BitmapConfig) -> usize {
    width as usize * height as usize * config.bytes_per_pixel()
}

/// An encoded image held in pooled native memory.
#[derive(Debug)]
pub struct PooledByteBuffer {
    bytes: Bytes,
    allocation: NativeAllocation,
    closed: AtomicBool,
}

impl PooledByteBuffer {
    pub fn new(pool: &Arc<NativeMemoryPool>, bytes: Bytes) -> Self {
        Self {
            allocation: pool.allocate(bytes.len()),
            bytes,
            closed: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The whole buffer, or [`None`] once it has been closed.
    pub fn bytes(&self) -> Option<Bytes> {
        self.is_valid().then(|| self.bytes.clone())
    }

    /// Up to `len` bytes starting at `offset`.
    pub fn read(&self, offset: usize, len: usize) -> Option<Bytes> {
        if !self.is_valid() || offset > self.bytes.len() {
            return None;
        }

        let end = offset.saturating_add(len).min(self.bytes.len());
        Some(self.bytes.slice(offset..end))
    }
}

impl CachedValue for PooledByteBuffer {
    fn size_in_bytes(&self) -> usize {
        self.len()
    }

    fn is_valid(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn dispose(&self) -> Result<(), DisposeError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.allocation.release()
    }
}
