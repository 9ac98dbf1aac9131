use counting_memory_cache::{CacheTrimStrategy, MemoryTrimType};

use super::*;

#[test]
fn test_bitmap_strategy() {
    let strategy = BitmapMemoryCacheTrimStrategy;

    assert_eq!(strategy.retain_ratio(MemoryTrimType::OnCloseToHeapLimit), 0.5);
    assert_eq!(strategy.retain_ratio(MemoryTrimType::OnSystemLowMemoryWhileAppInForeground), 0.1);
    assert_eq!(strategy.retain_ratio(MemoryTrimType::OnSystemLowMemoryWhileAppInBackground), 0.0);
    assert_eq!(strategy.retain_ratio(MemoryTrimType::OnAppBackgrounded), 0.0);
    assert_eq!(strategy.retain_ratio(MemoryTrimType::Unknown(42)), 0.0);
}

#[test]
fn test_native_strategy() {
    let strategy = NativeMemoryCacheTrimStrategy;

    assert_eq!(strategy.retain_ratio(MemoryTrimType::LOW), 1.0);
    assert_eq!(strategy.retain_ratio(MemoryTrimType::MODERATE), 0.5);
    assert_eq!(strategy.retain_ratio(MemoryTrimType::CRITICAL), 0.0);
    assert_eq!(strategy.retain_ratio(MemoryTrimType::OnAppBackgrounded), 0.0);
    assert_eq!(strategy.retain_ratio(MemoryTrimType::from_level(3)), 0.0);
}

#[test]
fn test_strategies_stay_in_range() {
    let levels = [0, 5, 10, 15, 20, 40, 60, 80, 100];

    for level in levels {
        let trim_type = MemoryTrimType::from_level(level);
        let bitmap = BitmapMemoryCacheTrimStrategy.retain_ratio(trim_type);
        let native = NativeMemoryCacheTrimStrategy.retain_ratio(trim_type);

        assert!((0.0..=1.0).contains(&bitmap));
        assert!((0.0..=1.0).contains(&native));
        assert!(bitmap <= native);
    }
}
