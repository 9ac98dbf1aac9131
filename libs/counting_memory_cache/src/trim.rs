use std::sync::Weak;

use parking_lot::Mutex;

/// Memory pressure signals delivered by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryTrimType {
    /// The process is getting close to its heap limit.
    OnCloseToHeapLimit,

    /// The system is low on memory while the app is in the foreground.
    OnSystemLowMemoryWhileAppInForeground,

    /// The system is low on memory while the app is in the background.
    OnSystemLowMemoryWhileAppInBackground,

    /// The app moved to the background.
    OnAppBackgrounded,

    /// A level this crate does not know about.
    Unknown(i32),
}

impl MemoryTrimType {
    /// Aliases matching the usual low / moderate / critical vocabulary.
    pub const LOW: Self = Self::OnCloseToHeapLimit;
    pub const MODERATE: Self = Self::OnSystemLowMemoryWhileAppInForeground;
    pub const CRITICAL: Self = Self::OnSystemLowMemoryWhileAppInBackground;

    /// Translates a raw host trim level into a trim type.
    pub fn from_level(level: i32) -> Self {
        match level {
            5 | 10 => Self::OnCloseToHeapLimit,
            15 => Self::OnSystemLowMemoryWhileAppInForeground,
            20 | 40 => Self::OnAppBackgrounded,
            60 | 80 => Self::OnSystemLowMemoryWhileAppInBackground,
            other => Self::Unknown(other),
        }
    }

    /// The pressure signal in `[0, 1]` this trim type carries; higher means
    /// more memory should be given back.
    pub fn suggested_trim_ratio(&self) -> f64 {
        match self {
            Self::OnCloseToHeapLimit => 0.5,
            Self::OnSystemLowMemoryWhileAppInForeground => 0.5,
            Self::OnSystemLowMemoryWhileAppInBackground => 1.0,
            Self::OnAppBackgrounded => 1.0,
            Self::Unknown(_) => 1.0,
        }
    }
}

/// Something which can give memory back when the host is under pressure.
pub trait MemoryTrimmable: Send + Sync {
    fn trim(&self, trim_type: MemoryTrimType);
}

/// Collects [`MemoryTrimmable`]s so the host can deliver pressure signals.
///
/// Registrations are weak: a registry never keeps a cache alive.
pub trait MemoryTrimmableRegistry: Send + Sync {
    fn register_memory_trimmable(&self, trimmable: Weak<dyn MemoryTrimmable>);
}

/// A registry which drops every registration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMemoryTrimmableRegistry;

impl MemoryTrimmableRegistry for NoOpMemoryTrimmableRegistry {
    fn register_memory_trimmable(&self, _trimmable: Weak<dyn MemoryTrimmable>) {}
}

/// A registry owned by the hosting application, which fans pressure signals
/// out to every live registrant.
#[derive(Default)]
pub struct TrimRegistry {
    trimmables: Mutex<Vec<Weak<dyn MemoryTrimmable>>>,
}

impl TrimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `trim_type` to every registrant which is still alive, and
    /// forgets the ones which are not. Returns the number of registrants
    /// trimmed.
    pub fn trim_all(&self, trim_type: MemoryTrimType) -> usize {
        // Upgrade under the lock, but trim outside of it, so a trimmable may
        // register new trimmables from its callback.
        let live = {
            let mut trimmables = self.trimmables.lock();
            trimmables.retain(|t| t.strong_count() > 0);
            trimmables
                .iter()
                .filter_map(Weak::upgrade)
                .collect::<Vec<_>>()
        };

        tracing::debug!(?trim_type, registrants = live.len(), "dispatching memory trim");

        for trimmable in &live {
            trimmable.trim(trim_type);
        }

        live.len()
    }

    /// Same as [`TrimRegistry::trim_all`], for a raw host trim level.
    pub fn on_trim_memory(&self, level: i32) -> usize {
        self.trim_all(MemoryTrimType::from_level(level))
    }

    /// Number of registrants which are still alive.
    pub fn len(&self) -> usize {
        self.trimmables
            .lock()
            .iter()
            .filter(|t| t.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MemoryTrimmableRegistry for TrimRegistry {
    fn register_memory_trimmable(&self, trimmable: Weak<dyn MemoryTrimmable>) {
        self.trimmables.lock().push(trimmable);
    }
}
