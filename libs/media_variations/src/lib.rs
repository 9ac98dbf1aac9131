//! Tracks the differently-sized renditions of a piece of media that have been
//! cached, so a cache miss for one size can fall back to another.

pub use index::{
    LookupFuture, MediaVariationsIndex, MemoryMediaVariationsIndex, NoOpMediaVariationsIndex,
};
pub use variations::{
    CacheChoice, MediaVariations, MediaVariationsBuilder, Variant, VariantSummary, VariantsSource,
};

mod index;
mod variations;
