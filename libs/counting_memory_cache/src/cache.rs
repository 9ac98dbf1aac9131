use std::collections::HashMap;
use std::sync::{Arc, Weak};

use lru::LruCache;
use parking_lot::Mutex;

use crate::cache_ref::CacheRef;
use crate::entry::{Entry, EntryId, ExclusivityChange};
use crate::error::CacheError;
use crate::params::{MemoryCacheParams, MemoryCacheParamsSupplier};
use crate::trim::{MemoryTrimType, MemoryTrimmable};
use crate::types::*;

/// A memory cache which hands out reference-counted handles to its values.
///
/// Entries referenced by at least one [`CacheRef`] are never disposed. When an
/// entry leaves the cache while clients still reference it (eviction, removal,
/// trim or replacement under the same key), it becomes an orphan: invisible to
/// lookups, and disposed once its last handle is dropped.
///
/// All bookkeeping happens under a single lock per cache. Disposal, observer
/// callbacks and tracker events run after the lock has been released.
pub struct CountingMemoryCache<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    pub(crate) inner: Arc<CacheInner<K, V>>,
}

/// A point-in-time view of a cache's accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Non-orphaned entries.
    pub count: usize,

    /// Bytes held by non-orphaned entries.
    pub size_in_bytes: usize,

    /// Entries with outstanding client references, orphans included.
    pub in_use_count: usize,

    /// Bytes held by entries with outstanding client references.
    pub in_use_size_in_bytes: usize,

    /// Entries owned by the cache alone, which eviction may remove.
    pub eviction_queue_count: usize,

    /// Bytes held by entries owned by the cache alone.
    pub eviction_queue_size_in_bytes: usize,

    /// Entries removed from the cache but still referenced by clients.
    pub orphan_count: usize,

    /// Budgets last read from the params supplier.
    pub params: MemoryCacheParams,
}

impl<K, V> CountingMemoryCache<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    /// Create a new cache. `diagnostics` enables per-entry debug logging of
    /// evictions and rejected inserts.
    pub fn new<D, T, P>(
        value_descriptor: D,
        trim_strategy: T,
        params_supplier: P,
        tracker: Arc<dyn MemoryCacheTracker<K>>,
        diagnostics: bool,
    ) -> Self
    where
        D: ValueDescriptor<V> + 'static,
        T: CacheTrimStrategy + 'static,
        P: MemoryCacheParamsSupplier + 'static,
    {
        let params = params_supplier.get();

        Self {
            inner: Arc::new(CacheInner {
                state: Mutex::new(State::new(params)),
                value_descriptor: Box::new(value_descriptor),
                trim_strategy: Box::new(trim_strategy),
                params_supplier: Box::new(params_supplier),
                tracker,
                diagnostics,
            }),
        }
    }

    /// Looks up `key`, acquiring a client reference on a hit. A hit makes the
    /// entry the most recently used one.
    pub fn get(&self, key: &K) -> Option<CacheRef<K, V>> {
        self.inner.get(key, true)
    }

    /// Same as [`CountingMemoryCache::get`], except that a miss is not
    /// reported to the tracker. For lookups of keys which may well be gone.
    pub fn try_get(&self, key: &K) -> Option<CacheRef<K, V>> {
        self.inner.get(key, false)
    }

    /// Caches `value` under `key` and returns a handle to it.
    ///
    /// Any entry already cached under `key` is removed first. Returns [`None`]
    /// if the value cannot be cached under the current budgets, in which case
    /// it has already been disposed.
    pub fn put(&self, key: K, value: V) -> Option<CacheRef<K, V>> {
        self.inner.put(key, value, None)
    }

    /// Same as [`CountingMemoryCache::put`], additionally notifying `observer`
    /// whenever the entry's exclusivity changes.
    pub fn put_with_observer(
        &self,
        key: K,
        value: V,
        observer: Arc<dyn EntryStateObserver<K>>,
    ) -> Option<CacheRef<K, V>> {
        self.inner.put(key, value, Some(observer))
    }

    /// Removes every entry whose key matches `predicate`, returning how many
    /// were removed. Entries still referenced by clients survive as orphans.
    ///
    /// `predicate` runs with the cache locked and must not call back into
    /// this cache, or it deadlocks.
    pub fn remove_all<F>(&self, predicate: F) -> usize
    where
        F: Fn(&K) -> bool,
    {
        self.inner.remove_all(predicate)
    }

    /// Removes the entry cached under `key`, if any.
    pub fn remove(&self, key: &K) -> bool {
        self.inner.remove_all(|k| k == key) > 0
    }

    /// Removes every entry.
    pub fn clear(&self) -> usize {
        self.inner.remove_all(|_| true)
    }

    /// Takes an entry which no client references out of the cache, handing
    /// its value to the caller undisposed so its resources can be reused.
    pub fn reuse(&self, key: &K) -> Option<V> {
        self.inner.reuse(key)
    }

    /// Returns whether `key` is cached. Does not count as a hit.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.state.lock().cached.contains(key)
    }

    /// Returns whether any cached key matches `predicate`.
    ///
    /// `predicate` runs with the cache locked and must not call back into
    /// this cache, or it deadlocks.
    pub fn contains_matching<F>(&self, predicate: F) -> bool
    where
        F: Fn(&K) -> bool,
    {
        self.inner
            .state
            .lock()
            .cached
            .iter()
            .any(|(key, _)| predicate(key))
    }

    /// Gives memory back in response to `trim_type`.
    ///
    /// Entries owned by the cache alone are evicted, least recently used
    /// first, until the cache is within the fraction of its maximum size the
    /// trim strategy retains. If that is not enough, referenced entries are
    /// orphaned; they stay valid for their holders.
    pub fn trim(&self, trim_type: MemoryTrimType) {
        self.inner.apply_trim(trim_type)
    }

    /// A weak reference suitable for a [`MemoryTrimmableRegistry`](crate::MemoryTrimmableRegistry).
    pub fn as_trimmable(&self) -> Weak<dyn MemoryTrimmable> {
        let trimmable: Arc<dyn MemoryTrimmable> = self.inner.clone();
        Arc::downgrade(&trimmable)
    }

    pub fn count(&self) -> usize {
        self.inner.state.lock().cached.len()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.inner.state.lock().counters.size_bytes
    }

    pub fn in_use_count(&self) -> usize {
        self.inner.state.lock().counters.in_use_count
    }

    pub fn in_use_size_in_bytes(&self) -> usize {
        self.inner.state.lock().counters.in_use_size_bytes
    }

    pub fn eviction_queue_count(&self) -> usize {
        self.inner.state.lock().counters.exclusive_count
    }

    pub fn eviction_queue_size_in_bytes(&self) -> usize {
        self.inner.state.lock().counters.exclusive_size_bytes
    }

    /// Budgets last read from the params supplier.
    pub fn params(&self) -> MemoryCacheParams {
        self.inner.state.lock().params
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.state.lock().stats()
    }
}

impl<K, V> Clone for CountingMemoryCache<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> MemoryTrimmable for CountingMemoryCache<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    fn trim(&self, trim_type: MemoryTrimType) {
        self.inner.apply_trim(trim_type)
    }
}

pub(crate) struct CacheInner<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    pub(crate) state: Mutex<State<K, V>>,
    value_descriptor: Box<dyn ValueDescriptor<V>>,
    trim_strategy: Box<dyn CacheTrimStrategy>,
    params_supplier: Box<dyn MemoryCacheParamsSupplier>,
    tracker: Arc<dyn MemoryCacheTracker<K>>,
    diagnostics: bool,
}

impl<K, V> CacheInner<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    fn get(self: &Arc<Self>, key: &K, report_miss: bool) -> Option<CacheRef<K, V>> {
        let (hit, change) = {
            let mut state = self.state.lock();
            let State {
                cached, counters, ..
            } = &mut *state;

            let found = match cached.get_mut(key) {
                Some(entry) => {
                    let was_exclusive = counters.acquire(entry);
                    let change = ExclusivityChange::of(entry, false).filter(|_| was_exclusive);

                    (Some((entry.key.clone(), entry.id, entry.value.clone())), change)
                }
                None => (None, None),
            };

            if found.0.is_some() {
                state.check_in_use_budget();
            }

            found
        };

        if let Some(change) = change {
            change.notify();
        }

        match hit {
            Some((key, id, value)) => {
                self.tracker.on_cache_hit(&key);
                Some(CacheRef::new(self.clone(), key, id, value))
            }
            None => {
                if report_miss {
                    self.tracker.on_cache_miss();
                }
                None
            }
        }
    }

    fn put(
        self: &Arc<Self>,
        key: K,
        value: V,
        observer: Option<Arc<dyn EntryStateObserver<K>>>,
    ) -> Option<CacheRef<K, V>> {
        let params = self.params_supplier.get();
        let size_bytes = self.value_descriptor.size_in_bytes(&value);
        let mut deferred = Deferred::default();

        let outcome = {
            let mut state = self.state.lock();
            state.params = params;

            // The entry being replaced goes away whether or not the new value
            // turns out to be cacheable.
            if let Some(previous) = state.cached.pop(&key) {
                state.orphan(previous, &mut deferred);
            }

            if state.can_cache(size_bytes) {
                let id = state.next_id;
                state.next_id += 1;

                let mut entry = Entry::new(id, key.clone(), value, size_bytes, observer);
                state.counters.insert(&entry);
                state.counters.acquire(&mut entry);

                let shared = entry.value.clone();
                state.cached.put(key.clone(), entry);

                let evicted = state.evict_to_budget(&mut deferred);
                if self.diagnostics && evicted > 0 {
                    tracing::debug!(evicted, size_bytes, "evicted entries to make room");
                }
                state.check_in_use_budget();

                Ok((id, shared))
            } else {
                Err(value)
            }
        };

        self.finish(deferred);

        match outcome {
            Ok((id, value)) => {
                self.tracker.on_cache_put();
                Some(CacheRef::new(self.clone(), key, id, value))
            }
            Err(value) => {
                if self.diagnostics {
                    tracing::debug!(
                        size_bytes,
                        max_entry_size = params.max_cache_entry_size,
                        max_size = params.max_cache_size,
                        "value not cached"
                    );
                }
                self.dispose_value(&key, &value);
                None
            }
        }
    }

    fn remove_all<F>(&self, predicate: F) -> usize
    where
        F: Fn(&K) -> bool,
    {
        let mut deferred = Deferred::default();

        let removed = {
            let mut state = self.state.lock();
            let keys = state
                .cached
                .iter()
                .filter(|(key, _)| predicate(key))
                .map(|(key, _)| key.clone())
                .collect::<Vec<_>>();

            for key in &keys {
                if let Some(entry) = state.cached.pop(key) {
                    state.orphan(entry, &mut deferred);
                }
            }

            keys.len()
        };

        self.finish(deferred);
        removed
    }

    fn reuse(&self, key: &K) -> Option<V> {
        let mut deferred = Deferred::default();

        let entry = {
            let mut state = self.state.lock();

            match state.cached.peek(key) {
                Some(entry) if entry.is_exclusive() => {}
                _ => return None,
            }

            let mut entry = state.cached.pop(key)?;
            state.counters.detach(&mut entry);
            deferred.changes.extend(ExclusivityChange::of(&entry, false));
            entry
        };

        self.finish(deferred);

        // Every client reference has been released, so the cache holds the
        // only copy of the value.
        match Arc::try_unwrap(entry.value) {
            Ok(value) => Some(value),
            Err(value) => {
                tracing::error!(entry = entry.id, "exclusive entry value is still shared");
                self.dispose_value(&entry.key, &value);
                None
            }
        }
    }

    fn apply_trim(&self, trim_type: MemoryTrimType) {
        let ratio = self.trim_strategy.retain_ratio(trim_type).clamp(0.0, 1.0);
        let params = self.params_supplier.get();
        let mut deferred = Deferred::default();

        let (evicted, orphaned, size_bytes) = {
            let mut state = self.state.lock();
            state.params = params;

            let target = (params.max_cache_size as f64 * ratio) as usize;
            let evicted = state.shed(params.max_cache_entries, target, false, &mut deferred);

            // Referenced entries cannot be freed, but they can stop counting
            // against the cache.
            let orphaned = state.shed(params.max_cache_entries, target, true, &mut deferred);

            (evicted, orphaned, state.counters.size_bytes)
        };

        tracing::debug!(
            ?trim_type,
            ratio,
            evicted,
            orphaned,
            size_bytes,
            "trimmed memory cache"
        );

        self.finish(deferred);
    }

    /// Releases one client reference on entry `id`, cached under `key`.
    pub(crate) fn release_client_reference(&self, key: &K, id: EntryId) -> Result<(), CacheError> {
        let mut deferred = Deferred::default();
        let result = self.state.lock().release(key, id, &mut deferred);

        self.finish(deferred);

        if let Err(error) = &result {
            tracing::error!(%error, "rejected client reference release");
        }

        result
    }

    fn finish(&self, deferred: Deferred<K, V>) {
        for change in deferred.changes {
            change.notify();
        }

        for entry in deferred.disposals {
            if self.diagnostics {
                tracing::debug!(entry = entry.id, size_bytes = entry.size_bytes, "disposing");
            }
            self.dispose_value(&entry.key, &entry.value);
        }
    }

    fn dispose_value(&self, key: &K, value: &V) {
        if let Err(error) = value.dispose() {
            tracing::warn!(%error, "failed to dispose cached value");
            self.tracker.on_dispose_failure(key, &error);
        }
    }
}

impl<K, V> MemoryTrimmable for CacheInner<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    fn trim(&self, trim_type: MemoryTrimType) {
        self.apply_trim(trim_type)
    }
}

impl<K, V> Drop for CacheInner<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    fn drop(&mut self) {
        // Handles keep the cache alive, so nothing is referenced any more and
        // there are no orphans left.
        let state = self.state.get_mut();
        let entries = std::mem::replace(&mut state.cached, LruCache::unbounded());

        for (key, entry) in entries {
            self.dispose_value(&key, &entry.value);
        }
    }
}

/// Work collected under the lock, to be carried out after it is released.
struct Deferred<K, V> {
    changes: Vec<ExclusivityChange<K>>,
    disposals: Vec<Entry<K, V>>,
}

impl<K, V> Default for Deferred<K, V> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
            disposals: Vec::new(),
        }
    }
}

/// Running totals. Every transition of an entry goes through one of these
/// methods so the totals always match the entries.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Counters {
    pub(crate) size_bytes: usize,
    pub(crate) in_use_count: usize,
    pub(crate) in_use_size_bytes: usize,
    pub(crate) exclusive_count: usize,
    pub(crate) exclusive_size_bytes: usize,
}

impl Counters {
    /// A new entry joins the cache with no client references.
    fn insert<K, V>(&mut self, entry: &Entry<K, V>) {
        self.size_bytes += entry.size_bytes;
        self.exclusive_count += 1;
        self.exclusive_size_bytes += entry.size_bytes;
    }

    /// Returns whether the entry was exclusively owned by the cache.
    fn acquire<K, V>(&mut self, entry: &mut Entry<K, V>) -> bool {
        let was_exclusive = entry.is_exclusive();

        if entry.client_count == 0 {
            self.in_use_count += 1;
            self.in_use_size_bytes += entry.size_bytes;
        }
        if was_exclusive {
            self.exclusive_count -= 1;
            self.exclusive_size_bytes -= entry.size_bytes;
        }

        entry.client_count += 1;
        was_exclusive
    }

    /// Returns whether the entry became exclusively owned by the cache.
    fn release<K, V>(&mut self, entry: &mut Entry<K, V>) -> Result<bool, CacheError> {
        if entry.client_count == 0 {
            return Err(CacheError::ReleaseWithoutAcquire { entry: entry.id });
        }

        entry.client_count -= 1;
        if entry.client_count > 0 {
            return Ok(false);
        }

        self.in_use_count -= 1;
        self.in_use_size_bytes -= entry.size_bytes;

        if entry.is_orphan {
            return Ok(false);
        }

        self.exclusive_count += 1;
        self.exclusive_size_bytes += entry.size_bytes;
        Ok(true)
    }

    /// The entry stops counting against the cache. Returns whether it was
    /// exclusively owned by the cache.
    fn detach<K, V>(&mut self, entry: &mut Entry<K, V>) -> bool {
        let was_exclusive = entry.is_exclusive();

        self.size_bytes -= entry.size_bytes;
        if was_exclusive {
            self.exclusive_count -= 1;
            self.exclusive_size_bytes -= entry.size_bytes;
        }

        entry.is_orphan = true;
        was_exclusive
    }
}

pub(crate) struct State<K, V>
where
    K: CacheKey,
{
    /// Non-orphaned entries, most recently used first.
    pub(crate) cached: LruCache<K, Entry<K, V>>,

    /// Orphaned entries still referenced by clients.
    pub(crate) orphans: HashMap<EntryId, Entry<K, V>>,

    pub(crate) counters: Counters,
    pub(crate) params: MemoryCacheParams,
    next_id: EntryId,
}

impl<K, V> State<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    fn new(params: MemoryCacheParams) -> Self {
        Self {
            cached: LruCache::unbounded(),
            orphans: HashMap::new(),
            counters: Counters::default(),
            params,
            next_id: 0,
        }
    }

    /// Checks whether a value of `size_bytes` could be cached once every
    /// evictable entry is gone.
    fn can_cache(&self, size_bytes: usize) -> bool {
        let params = &self.params;
        let pinned_count = self.cached.len() - self.counters.exclusive_count;
        let pinned_size = self.counters.size_bytes - self.counters.exclusive_size_bytes;

        size_bytes <= params.max_cache_entry_size
            && pinned_count < params.max_cache_entries
            && pinned_size.saturating_add(size_bytes) <= params.max_cache_size
    }

    fn evict_to_budget(&mut self, deferred: &mut Deferred<K, V>) -> usize {
        let (count_limit, size_limit) = (self.params.max_cache_entries, self.params.max_cache_size);
        self.shed(count_limit, size_limit, false, deferred)
    }

    /// Removes entries, least recently used first, until the cache holds at
    /// most `count_limit` entries and `size_limit` bytes. Only exclusively
    /// owned entries are considered unless `include_in_use` is set. Returns
    /// the number of entries removed.
    fn shed(
        &mut self,
        count_limit: usize,
        size_limit: usize,
        include_in_use: bool,
        deferred: &mut Deferred<K, V>,
    ) -> usize {
        let mut count = self.cached.len();
        let mut size_bytes = self.counters.size_bytes;
        let mut victims = Vec::new();

        for (key, entry) in self.cached.iter().rev() {
            if count <= count_limit && size_bytes <= size_limit {
                break;
            }

            if include_in_use || entry.is_exclusive() {
                victims.push(key.clone());
                count -= 1;
                size_bytes -= entry.size_bytes;
            }
        }

        for key in &victims {
            if let Some(entry) = self.cached.pop(key) {
                self.orphan(entry, deferred);
            }
        }

        victims.len()
    }

    /// Takes an entry already popped from `cached` out of the accounting.
    /// Unreferenced entries are queued for disposal, referenced ones are kept
    /// until their last client reference is released.
    fn orphan(&mut self, mut entry: Entry<K, V>, deferred: &mut Deferred<K, V>) {
        if self.counters.detach(&mut entry) {
            deferred.changes.extend(ExclusivityChange::of(&entry, false));
        }

        if entry.client_count == 0 {
            deferred.disposals.push(entry);
        } else {
            self.orphans.insert(entry.id, entry);
        }
    }

    fn release(
        &mut self,
        key: &K,
        id: EntryId,
        deferred: &mut Deferred<K, V>,
    ) -> Result<(), CacheError> {
        if let Some(entry) = self.cached.peek_mut(key) {
            if entry.id == id {
                if self.counters.release(entry)? {
                    deferred.changes.extend(ExclusivityChange::of(entry, true));
                    self.evict_to_budget(deferred);
                }
                return Ok(());
            }
        }

        let entry = self
            .orphans
            .get_mut(&id)
            .ok_or(CacheError::UnknownEntry { entry: id })?;
        self.counters.release(entry)?;

        if entry.client_count == 0 {
            if let Some(entry) = self.orphans.remove(&id) {
                deferred.disposals.push(entry);
            }
        }

        Ok(())
    }

    fn check_in_use_budget(&self) {
        let in_use = self.counters.in_use_size_bytes;
        if in_use > self.params.max_in_use_size {
            tracing::warn!(
                in_use,
                max_in_use_size = self.params.max_in_use_size,
                "entries in use exceed their budget"
            );
        }
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            count: self.cached.len(),
            size_in_bytes: self.counters.size_bytes,
            in_use_count: self.counters.in_use_count,
            in_use_size_in_bytes: self.counters.in_use_size_bytes,
            eviction_queue_count: self.counters.exclusive_count,
            eviction_queue_size_in_bytes: self.counters.exclusive_size_bytes,
            orphan_count: self.orphans.len(),
            params: self.params,
        }
    }
}
