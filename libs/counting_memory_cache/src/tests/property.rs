use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

const MAX_SIZE: usize = 200;
const MAX_ENTRIES: usize = 8;

/// Drives one cache through a random sequence of operations, checking the
/// accounting and the budgets after every step.
fn run_sequence(seed: u64) {
    let (cache, _) = make_cache_with_strategy(
        MemoryCacheParams::new(MAX_SIZE, MAX_ENTRIES, 60, MAX_SIZE),
        |trim_type: MemoryTrimType| 1.0 - trim_type.suggested_trim_ratio(),
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let mut latest: HashMap<String, u32> = HashMap::new();
    let mut held = Vec::new();
    let mut next_tag = 0u32;

    for _ in 0..500 {
        let name = format!("k{}", rng.gen_range(0..12));

        match rng.gen_range(0..12) {
            0..=3 => {
                if let Some(handle) = cache.get(&name) {
                    assert_eq!(Some(&handle.tag()), latest.get(&name));
                    held.push(handle);
                }
            }
            4..=7 => {
                next_tag += 1;
                let value = FakeValue::new(next_tag, rng.gen_range(1..80));

                match cache.put(name.clone(), value) {
                    Some(handle) => {
                        latest.insert(name, next_tag);
                        if rng.gen_bool(0.5) {
                            held.push(handle);
                        }
                    }
                    None => {
                        latest.remove(&name);
                    }
                }
            }
            8 => {
                cache.remove(&name);
                latest.remove(&name);
            }
            9 => {
                if cache.reuse(&name).is_some() {
                    latest.remove(&name);
                }
            }
            10 => {
                let level = [5, 15, 20, 60, 3][rng.gen_range(0..5)];
                cache.trim(MemoryTrimType::from_level(level));
            }
            _ => {
                if !held.is_empty() {
                    held.swap_remove(rng.gen_range(0..held.len()));
                }
            }
        }

        assert_accounting(&cache);
        assert!(cache.size_in_bytes() <= MAX_SIZE);
        assert!(cache.count() <= MAX_ENTRIES);
        assert!(held.iter().all(|handle| handle.is_valid()));
    }

    held.clear();
    assert_accounting(&cache);
    assert_eq!(cache.in_use_count(), 0);
    assert_eq!(cache.stats().orphan_count, 0);
}

#[test]
fn test_random_sequences_keep_accounting_consistent() {
    for seed in 0..16 {
        run_sequence(seed);
    }
}
