use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

const THREADS: u64 = 8;
const OPERATIONS: usize = 2_000;
const KEYS: usize = 24;

const MAX_SIZE: usize = 400;
const MAX_ENTRIES: usize = 16;

/// Runs a random mix of operations against a shared cache, returning the
/// disposal counts of every value it created.
fn run_worker(cache: TestCache, seed: u64) -> Vec<Arc<AtomicUsize>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut disposal_counts = Vec::new();
    let mut held = Vec::new();

    for i in 0..OPERATIONS {
        let name = format!("k{}", rng.gen_range(0..KEYS));

        match rng.gen_range(0..10) {
            0..=3 => {
                if let Some(handle) = cache.get(&name) {
                    assert!(handle.is_valid());
                    if rng.gen_bool(0.3) {
                        held.push(handle);
                    }
                }
            }
            4..=6 => {
                let value = FakeValue::new(i as u32, rng.gen_range(1..40));
                disposal_counts.push(value.disposals());

                if let Some(handle) = cache.put(name, value) {
                    if rng.gen_bool(0.3) {
                        held.push(handle);
                    }
                }
            }
            7 => {
                cache.remove(&name);
            }
            8 => {
                if let Some(value) = cache.reuse(&name) {
                    assert!(value.is_valid());
                    value.dispose().unwrap();
                }
            }
            _ => cache.trim(MemoryTrimType::MODERATE),
        }

        if held.len() > 4 {
            let handle = held.swap_remove(rng.gen_range(0..held.len()));
            assert!(handle.is_valid());
        }
    }

    assert!(held.iter().all(|handle| handle.is_valid()));
    disposal_counts
}

#[test]
fn test_concurrent_clients() {
    let (cache, tracker) = make_cache_with_strategy(
        MemoryCacheParams::new(MAX_SIZE, MAX_ENTRIES, 100, MAX_SIZE),
        |_: MemoryTrimType| 0.5,
    );

    let workers = (0..THREADS)
        .map(|seed| {
            let cache = cache.clone();
            thread::spawn(move || run_worker(cache, seed))
        })
        .collect::<Vec<_>>();

    let disposal_counts = workers
        .into_iter()
        .flat_map(|worker| worker.join().unwrap())
        .collect::<Vec<_>>();

    assert_accounting(&cache);
    assert_eq!(cache.in_use_count(), 0);
    assert_eq!(cache.stats().orphan_count, 0);
    assert!(cache.size_in_bytes() <= MAX_SIZE);
    assert!(cache.count() <= MAX_ENTRIES);
    assert_eq!(tracker.dispose_failures.load(Ordering::SeqCst), 0);

    cache.clear();

    assert_eq!(cache.count(), 0);
    assert!(disposal_counts.iter().all(|count| count.load(Ordering::SeqCst) == 1));
}

#[test]
fn test_handles_outlive_cache_across_threads() {
    let (cache, _) = make_cache(MemoryCacheParams::with_max_size(1_000));

    let value = FakeValue::new(1, 10);
    let disposals = value.disposals();
    let handle = cache.put(key("shared"), value).unwrap();

    let clones = (0..4).map(|_| handle.clone()).collect::<Vec<_>>();
    drop(handle);
    drop(cache);

    let workers = clones
        .into_iter()
        .map(|handle| {
            thread::spawn(move || {
                assert!(handle.is_valid());
                assert_eq!(handle.tag(), 1);
            })
        })
        .collect::<Vec<_>>();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(disposals.load(Ordering::SeqCst), 1);
}
