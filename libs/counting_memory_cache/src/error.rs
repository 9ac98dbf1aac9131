use thiserror::Error;

/// Failure to release the resource behind a cached value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisposeError {
    #[error("value was already invalid when disposed")]
    AlreadyInvalid,

    #[error("failed to release value: {0}")]
    Release(String),
}

/// Faults detected by the cache's reference counting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// A client reference was released more times than it was acquired.
    #[error("release of entry {entry} without a matching acquire")]
    ReleaseWithoutAcquire { entry: u64 },

    /// The entry a release or acquire refers to is no longer tracked.
    #[error("entry {entry} is not tracked by this cache")]
    UnknownEntry { entry: u64 },
}
