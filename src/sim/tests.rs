use super::*;

fn config(variations: bool) -> Config {
    Config {
        workers: 4,
        operations: 300,
        keyspace: 20,
        heap: 16,
        trim_interval: 1,
        seed: 7,
        variations,
        log_external_bitmaps: true,
    }
}

#[test]
fn test_simulation_releases_all_memory() {
    let report = run(&config(false)).unwrap();

    assert_eq!(report.fallbacks, 0);
    assert_eq!(report.bitmap.hits + report.bitmap.misses, 4 * 300);
    assert_eq!(report.bitmap.dispose_failures, 0);
}

#[test]
fn test_simulation_with_variations() {
    let report = run(&config(true)).unwrap();
    let requests = 4 * 300;

    // A request misses at most once however many stale variants it passes,
    // and a fallback adds one hit.
    assert!(report.bitmap.misses <= requests);
    assert_eq!(
        report.bitmap.hits + report.bitmap.misses,
        requests + report.fallbacks
    );
    assert!(report.bitmap.puts > 0);
    assert!(report.peak_native_bytes > 0);
}
