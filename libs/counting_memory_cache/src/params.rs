/// Budgets enforced by a [`CountingMemoryCache`](crate::CountingMemoryCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryCacheParams {
    /// Total bytes held by non-orphaned entries, in use or not.
    pub max_cache_size: usize,

    /// Number of non-orphaned entries.
    pub max_cache_entries: usize,

    /// Largest single value which may be cached.
    pub max_cache_entry_size: usize,

    /// Bytes held by entries with outstanding client references.
    ///
    /// This budget is advisory. Exceeding it is logged, but references which
    /// clients already hold cannot be revoked.
    pub max_in_use_size: usize,
}

impl MemoryCacheParams {
    pub fn new(
        max_cache_size: usize,
        max_cache_entries: usize,
        max_cache_entry_size: usize,
        max_in_use_size: usize,
    ) -> Self {
        Self {
            max_cache_size,
            max_cache_entries,
            max_cache_entry_size,
            max_in_use_size,
        }
    }

    /// Budgets which only limit total size; every other limit equals it or is
    /// unbounded.
    pub fn with_max_size(max_cache_size: usize) -> Self {
        Self::new(max_cache_size, usize::MAX, max_cache_size, max_cache_size)
    }
}

/// Source of [`MemoryCacheParams`]. The cache re-reads it at the start of
/// every size-affecting operation, so budgets may change at runtime.
pub trait MemoryCacheParamsSupplier: Send + Sync {
    fn get(&self) -> MemoryCacheParams;
}

impl MemoryCacheParamsSupplier for MemoryCacheParams {
    fn get(&self) -> MemoryCacheParams {
        *self
    }
}

impl<F> MemoryCacheParamsSupplier for F
where
    F: Fn() -> MemoryCacheParams + Send + Sync,
{
    fn get(&self) -> MemoryCacheParams {
        self()
    }
}
