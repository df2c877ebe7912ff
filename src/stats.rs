use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a wrapper's cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from the cache.
    pub hits: u64,
    /// Calls with cacheable arguments that had to invoke the function.
    pub misses: u64,
    /// Calls whose arguments could not be used as a key.
    pub uncached: u64,
    /// Entries currently stored.
    pub entries: usize,
}

impl CacheStats {
    /// Percentage of cacheable calls that were hits (0.0 to 100.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }

    /// Total number of calls made through the wrapper.
    pub fn calls(&self) -> u64 {
        self.hits + self.misses + self.uncached
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats(hits={}, misses={}, uncached={}, entries={})",
            self.hits, self.misses, self.uncached, self.entries
        )
    }
}

/// Counters for single-threaded wrappers.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: Cell<u64>,
    misses: Cell<u64>,
    uncached: Cell<u64>,
}

impl Counters {
    pub(crate) fn hit(&self) {
        self.hits.set(self.hits.get() + 1);
    }

    pub(crate) fn miss(&self) {
        self.misses.set(self.misses.get() + 1);
    }

    pub(crate) fn bypass(&self) {
        self.uncached.set(self.uncached.get() + 1);
    }

    pub(crate) fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            uncached: self.uncached.get(),
            entries,
        }
    }
}

/// Counters for wrappers shared between threads.
#[derive(Debug, Default)]
pub(crate) struct AtomicCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AtomicCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            uncached: 0,
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_ignores_uncached_calls() {
        let counters = Counters::default();
        counters.hit();
        counters.hit();
        counters.hit();
        counters.miss();
        counters.bypass();
        let stats = counters.snapshot(1);
        assert_eq!(stats.hit_rate(), 75.0);
        assert_eq!(stats.calls(), 5);
        assert_eq!(
            stats.to_string(),
            "CacheStats(hits=3, misses=1, uncached=1, entries=1)"
        );
    }

    #[test]
    fn empty_stats() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
        assert_eq!(AtomicCounters::default().snapshot(0), CacheStats::default());
    }
}
