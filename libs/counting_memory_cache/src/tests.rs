use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::*;

mod concurrency;
mod property;

/// A value which records how often it has actually been disposed.
pub(crate) struct FakeValue {
    tag: u32,
    size: usize,
    disposed: AtomicBool,
    disposals: Arc<AtomicUsize>,
    fail_dispose: bool,
}

impl FakeValue {
    pub(crate) fn new(tag: u32, size: usize) -> Self {
        Self {
            tag,
            size,
            disposed: AtomicBool::new(false),
            disposals: Arc::default(),
            fail_dispose: false,
        }
    }

    pub(crate) fn failing(tag: u32, size: usize) -> Self {
        Self {
            fail_dispose: true,
            ..Self::new(tag, size)
        }
    }

    pub(crate) fn tag(&self) -> u32 {
        self.tag
    }

    /// A disposal counter which stays readable after the value has moved into
    /// the cache.
    pub(crate) fn disposals(&self) -> Arc<AtomicUsize> {
        self.disposals.clone()
    }
}

impl CachedValue for FakeValue {
    fn size_in_bytes(&self) -> usize {
        self.size
    }

    fn is_valid(&self) -> bool {
        !self.disposed.load(Ordering::SeqCst)
    }

    fn dispose(&self) -> Result<(), DisposeError> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.disposals.fetch_add(1, Ordering::SeqCst);

        if self.fail_dispose {
            Err(DisposeError::Release("native free failed".into()))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingTracker {
    pub(crate) hits: AtomicUsize,
    pub(crate) misses: AtomicUsize,
    pub(crate) puts: AtomicUsize,
    pub(crate) dispose_failures: AtomicUsize,
}

impl<K> MemoryCacheTracker<K> for RecordingTracker {
    fn on_cache_hit(&self, _key: &K) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cache_miss(&self) {
        self.misses.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cache_put(&self) {
        self.puts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_dispose_failure(&self, _key: &K, _error: &DisposeError) {
        self.dispose_failures.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub(crate) events: Mutex<Vec<(String, bool)>>,
}

impl EntryStateObserver<String> for RecordingObserver {
    fn on_exclusivity_changed(&self, key: &String, is_exclusive: bool) {
        self.events.lock().push((key.clone(), is_exclusive));
    }
}

pub(crate) type TestCache = CountingMemoryCache<String, FakeValue>;

pub(crate) fn make_cache(params: MemoryCacheParams) -> (TestCache, Arc<RecordingTracker>) {
    make_cache_with_strategy(params, |_: MemoryTrimType| 0.0)
}

pub(crate) fn make_cache_with_strategy<T>(
    params: MemoryCacheParams,
    trim_strategy: T,
) -> (TestCache, Arc<RecordingTracker>)
where
    T: CacheTrimStrategy + 'static,
{
    let tracker = Arc::new(RecordingTracker::default());
    let cache: TestCache = CountingMemoryCache::new(
        |value: &FakeValue| value.size,
        trim_strategy,
        params,
        tracker.clone(),
        true,
    );

    (cache, tracker)
}

pub(crate) fn key(name: &str) -> String {
    name.to_owned()
}

/// Puts a value and immediately releases the returned handle, leaving the
/// entry owned by the cache alone.
pub(crate) fn put_released(cache: &TestCache, name: &str, value: FakeValue) -> Arc<AtomicUsize> {
    let disposals = value.disposals();
    drop(cache.put(key(name), value));
    disposals
}

/// Recomputes every total from the entries themselves and compares.
pub(crate) fn assert_accounting(cache: &TestCache) {
    let state = cache.inner.state.lock();
    let live = state.cached.iter().map(|(_, entry)| entry).collect::<Vec<_>>();
    let orphans = state.orphans.values().collect::<Vec<_>>();

    let size: usize = live.iter().map(|e| e.size_bytes).sum();
    let in_use = live
        .iter()
        .chain(orphans.iter())
        .filter(|e| e.client_count > 0)
        .collect::<Vec<_>>();
    let exclusive = live.iter().filter(|e| e.client_count == 0).collect::<Vec<_>>();

    assert_eq!(state.counters.size_bytes, size);
    assert_eq!(state.counters.in_use_count, in_use.len());
    assert_eq!(
        state.counters.in_use_size_bytes,
        in_use.iter().map(|e| e.size_bytes).sum::<usize>()
    );
    assert_eq!(state.counters.exclusive_count, exclusive.len());
    assert_eq!(
        state.counters.exclusive_size_bytes,
        exclusive.iter().map(|e| e.size_bytes).sum::<usize>()
    );

    assert!(live.iter().all(|e| !e.is_orphan && e.value.is_valid()));
    assert!(orphans
        .iter()
        .all(|e| e.is_orphan && e.client_count > 0 && e.value.is_valid()));
}

/// Returns the id of the entry currently cached under `name`.
pub(crate) fn entry_id(cache: &TestCache, name: &str) -> u64 {
    cache
        .inner
        .state
        .lock()
        .cached
        .peek(&key(name))
        .map(|entry| entry.id)
        .expect("entry is cached")
}
