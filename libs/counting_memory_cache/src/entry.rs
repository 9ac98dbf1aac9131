use std::sync::Arc;

use crate::types::EntryStateObserver;

/// Identifies an entry for the whole of its lifetime, including after it has
/// been orphaned and a new entry has taken over its key.
pub(crate) type EntryId = u64;

/// The cache's record for one cached value.
pub(crate) struct Entry<K, V> {
    pub(crate) id: EntryId,
    pub(crate) key: K,
    pub(crate) value: Arc<V>,
    pub(crate) size_bytes: usize,
    pub(crate) client_count: usize,
    pub(crate) is_orphan: bool,
    pub(crate) observer: Option<Arc<dyn EntryStateObserver<K>>>,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(
        id: EntryId,
        key: K,
        value: V,
        size_bytes: usize,
        observer: Option<Arc<dyn EntryStateObserver<K>>>,
    ) -> Self {
        Self {
            id,
            key,
            value: Arc::new(value),
            size_bytes,
            client_count: 0,
            is_orphan: false,
            observer,
        }
    }

    /// Owned by the cache alone, and therefore eligible for eviction.
    pub(crate) fn is_exclusive(&self) -> bool {
        self.client_count == 0 && !self.is_orphan
    }
}

/// A pending observer notification, delivered once the cache lock is released.
pub(crate) struct ExclusivityChange<K> {
    observer: Arc<dyn EntryStateObserver<K>>,
    key: K,
    is_exclusive: bool,
}

impl<K: Clone> ExclusivityChange<K> {
    pub(crate) fn of<V>(entry: &Entry<K, V>, is_exclusive: bool) -> Option<Self> {
        entry.observer.as_ref().map(|observer| Self {
            observer: observer.clone(),
            key: entry.key.clone(),
            is_exclusive,
        })
    }

    pub(crate) fn notify(self) {
        self.observer.on_exclusivity_changed(&self.key, self.is_exclusive);
    }
}
