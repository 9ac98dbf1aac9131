use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use counting_memory_cache::DisposeError;

/// Accounts for natively-backed memory handed out to images and buffers.
///
/// Allocation itself is left to the platform; the pool only keeps the
/// numbers, so leaks and double frees show up in them.
#[derive(Debug, Default)]
pub struct NativeMemoryPool {
    allocated_bytes: AtomicUsize,
    allocation_count: AtomicUsize,
    peak_bytes: AtomicUsize,
}

/// A point-in-time view of a [`NativeMemoryPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub allocated_bytes: usize,
    pub allocation_count: usize,
    pub peak_bytes: usize,
}

impl NativeMemoryPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn allocate(self: &Arc<Self>, size_bytes: usize) -> NativeAllocation {
        let allocated = self.allocated_bytes.fetch_add(size_bytes, Ordering::AcqRel) + size_bytes;
        self.allocation_count.fetch_add(1, Ordering::AcqRel);
        self.peak_bytes.fetch_max(allocated, Ordering::AcqRel);

        NativeAllocation {
            pool: self.clone(),
            size_bytes,
            released: AtomicBool::new(false),
        }
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes.load(Ordering::Acquire)
    }

    pub fn allocation_count(&self) -> usize {
        self.allocation_count.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated_bytes: self.allocated_bytes(),
            allocation_count: self.allocation_count(),
            peak_bytes: self.peak_bytes.load(Ordering::Acquire),
        }
    }

    fn free(&self, size_bytes: usize) {
        self.allocated_bytes.fetch_sub(size_bytes, Ordering::AcqRel);
        self.allocation_count.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One allocation from a [`NativeMemoryPool`]. Returned to the pool by
/// [`NativeAllocation::release`], or on drop if it never was.
#[derive(Debug)]
pub struct NativeAllocation {
    pool: Arc<NativeMemoryPool>,
    size_bytes: usize,
    released: AtomicBool,
}

impl NativeAllocation {
    pub fn size_in_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Gives the memory back. Fails if it has already been given back.
    pub fn release(&self) -> Result<(), DisposeError> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Err(DisposeError::AlreadyInvalid);
        }

        self.pool.free(self.size_bytes);
        Ok(())
    }
}

impl Drop for NativeAllocation {
    fn drop(&mut self) {
        if !*self.released.get_mut() {
            *self.released.get_mut() = true;
            self.pool.free(self.size_bytes);
        }
    }
}
