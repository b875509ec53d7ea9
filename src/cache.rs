use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::error::AppResult;
use crate::redis::RedisClient;
use crate::text_stats::TextStats;

/// Best-effort store for computed statistics, keyed by content-derived keys.
#[async_trait]
pub trait StatsCache: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<TextStats>>;

    /// Store `value`; `None` keeps it until evicted.
    async fn set(&self, key: &str, value: &TextStats, ttl: Option<Duration>) -> AppResult<()>;
}

#[derive(Clone)]
struct CacheEntry {
    stats: TextStats,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Entry count at which writes start purging expired entries.
const PURGE_THRESHOLD: usize = 1024;

/// Process-local cache.
///
/// Expired entries are dropped when read, and in bulk by `set` whenever the
/// map has grown past its purge mark. The mark doubles with the live entries
/// left after a purge so a cache full of unexpired stats is not rescanned on
/// every write.
pub struct InMemoryStatsCache {
    entries: DashMap<String, CacheEntry>,
    purge_at: AtomicUsize,
}

impl Default for InMemoryStatsCache {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            purge_at: AtomicUsize::new(PURGE_THRESHOLD),
        }
    }
}

impl InMemoryStatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let remaining = self.entries.len();
        self.purge_at.store(
            remaining.saturating_mul(2).max(PURGE_THRESHOLD),
            Ordering::Relaxed,
        );
        before.saturating_sub(remaining)
    }
}

#[async_trait]
impl StatsCache for InMemoryStatsCache {
    async fn get(&self, key: &str) -> AppResult<Option<TextStats>> {
        let now = Instant::now();
        let found = self.entries.get(key).map(|entry| entry.value().clone());
        match found {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove_if(key, |_, entry| entry.is_expired(now));
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.stats)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &TextStats, ttl: Option<Duration>) -> AppResult<()> {
        if self.entries.len() >= self.purge_at.load(Ordering::Relaxed) {
            let removed = self.purge_expired();
            tracing::debug!(removed, remaining = self.entries.len(), "Purged expired stats");
        }

        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                stats: value.clone(),
                expires_at,
            },
        );
        Ok(())
    }
}

/// Cache backed by Redis string values holding JSON.
pub struct RedisStatsCache {
    client: RedisClient,
}

impl RedisStatsCache {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatsCache for RedisStatsCache {
    async fn get(&self, key: &str) -> AppResult<Option<TextStats>> {
        match self.client.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &TextStats, ttl: Option<Duration>) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        match ttl.map(|ttl| ttl.as_secs().max(1)) {
            Some(seconds) => self.client.set_with_expiry(key, &raw, seconds).await,
            None => self.client.set(key, &raw).await,
        }
    }
}
