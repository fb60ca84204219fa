//! Engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Running counters of cache and provider activity.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// History requests served.
    pub requests_total: AtomicU64,
    /// History requests that failed.
    pub requests_failed: AtomicU64,
    /// Ranged provider calls issued.
    pub provider_fetches: AtomicU64,
    /// Latest-rate provider calls issued.
    pub latest_fetches: AtomicU64,
    /// Days served from the per-day cache.
    pub day_hits: AtomicU64,
    /// Days filled from the provider.
    pub day_misses: AtomicU64,
    /// Pages served straight from a stored page group.
    pub page_hits: AtomicU64,
    /// Page groups written.
    pub page_saves: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished history request.
    pub fn request_completed(&self, ok: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record the outcome of one backfill.
    pub fn backfilled(&self, fetches: usize, hit_days: usize, fetched_days: usize) {
        self.provider_fetches.fetch_add(fetches as u64, Ordering::Relaxed);
        self.day_hits.fetch_add(hit_days as u64, Ordering::Relaxed);
        self.day_misses.fetch_add(fetched_days as u64, Ordering::Relaxed);
    }

    pub fn latest_fetched(&self) {
        self.latest_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn page_hit(&self) {
        self.page_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn page_saved(&self) {
        self.page_saves.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current counters snapshot.
    pub fn snapshot(&self) -> EngineStats {
        EngineStats {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            provider_fetches: self.provider_fetches.load(Ordering::Relaxed),
            latest_fetches: self.latest_fetches.load(Ordering::Relaxed),
            day_hits: self.day_hits.load(Ordering::Relaxed),
            day_misses: self.day_misses.load(Ordering::Relaxed),
            page_hits: self.page_hits.load(Ordering::Relaxed),
            page_saves: self.page_saves.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of engine counters at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub requests_total: u64,
    pub requests_failed: u64,
    pub provider_fetches: u64,
    pub latest_fetches: u64,
    pub day_hits: u64,
    pub day_misses: u64,
    pub page_hits: u64,
    pub page_saves: u64,
}

impl EngineStats {
    /// Fraction of days served from cache, `None` before any day was served.
    pub fn day_hit_ratio(&self) -> Option<f64> {
        let total = self.day_hits + self.day_misses;
        (total > 0).then(|| self.day_hits as f64 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = EngineMetrics::new();

        metrics.backfilled(2, 3, 4);
        metrics.request_completed(true);
        metrics.request_completed(false);
        metrics.page_saved();

        let stats = metrics.snapshot();
        assert_eq!(stats.provider_fetches, 2);
        assert_eq!(stats.day_hits, 3);
        assert_eq!(stats.day_misses, 4);
        assert_eq!(stats.requests_total, 2);
        assert_eq!(stats.requests_failed, 1);
        assert_eq!(stats.page_saves, 1);
    }

    #[test]
    fn test_hit_ratio() {
        assert_eq!(EngineStats::default().day_hit_ratio(), None);

        let stats = EngineStats {
            day_hits: 3,
            day_misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.day_hit_ratio(), Some(0.75));
    }
}
