pub use cache::{CacheStats, CountingMemoryCache};
pub use cache_ref::CacheRef;
pub use error::{CacheError, DisposeError};
pub use params::{MemoryCacheParams, MemoryCacheParamsSupplier};
pub use trim::{
    MemoryTrimType, MemoryTrimmable, MemoryTrimmableRegistry, NoOpMemoryTrimmableRegistry,
    TrimRegistry,
};
pub use types::*;

mod cache;
mod cache_ref;
mod entry;
mod error;
mod params;
mod trim;
pub mod types;
#[cfg(test)]
mod tests;
