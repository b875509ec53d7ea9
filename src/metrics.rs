use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub allowed_requests: u64,
    pub throttled_requests: u64,
    pub failed_open_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub persistence_failures: u64,
    pub since: u64,
}

/// Process-wide counters for admission and caching outcomes.
#[derive(Debug)]
pub struct Metrics {
    allowed: AtomicU64,
    throttled: AtomicU64,
    failed_open: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    persistence_failures: AtomicU64,
    since: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            allowed: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
            failed_open: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
            since: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, allowed: bool) {
        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.throttled.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A request let through because the limiter itself failed.
    pub fn record_fail_open(&self) {
        self.failed_open.fetch_add(1, Ordering::Relaxed);
        self.allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let allowed = self.allowed.load(Ordering::Relaxed);
        let throttled = self.throttled.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: allowed + throttled,
            allowed_requests: allowed,
            throttled_requests: throttled,
            failed_open_requests: self.failed_open.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            since: self.since,
        }
    }
}
