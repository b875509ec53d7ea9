use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::cache::StatsCache;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::repository::{AnalysisRepository, TextAnalysisRecord};
use crate::text_stats::TextStats;
use crate::text_utils::{cache_key, normalize};

/// Text statistics with a content-addressed cache in front and an audit
/// trail of analyses behind.
pub struct TextAnalyzerService {
    repository: Arc<dyn AnalysisRepository>,
    cache: Arc<dyn StatsCache>,
    cache_ttl: Option<Duration>,
    metrics: Arc<Metrics>,
}

impl TextAnalyzerService {
    pub fn new(
        repository: Arc<dyn AnalysisRepository>,
        cache: Arc<dyn StatsCache>,
        cache_ttl: Option<Duration>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            repository,
            cache,
            cache_ttl,
            metrics,
        }
    }

    /// Full statistics for `content`, recording the analysis for `user_id`.
    ///
    /// A record is written on cache hits as well. Failing to write it is
    /// logged and does not fail the call.
    pub async fn analyze_text(&self, user_id: &str, content: &str) -> AppResult<TextStats> {
        let stats = self.stats_for(user_id, content).await?;

        match self.repository.create(user_id, content, &stats).await {
            Ok(record) => {
                tracing::info!(user_id, record_id = %record.id, "Text analysis saved");
            }
            Err(err) => {
                self.metrics.record_persistence_failure();
                tracing::error!(user_id, error = %err, "Error saving text analysis");
            }
        }

        Ok(stats)
    }

    pub async fn word_count(&self, user_id: &str, content: &str) -> AppResult<usize> {
        Ok(self.stats_for(user_id, content).await?.word_count)
    }

    pub async fn character_count(&self, user_id: &str, content: &str) -> AppResult<usize> {
        Ok(self.stats_for(user_id, content).await?.character_count)
    }

    pub async fn sentence_count(&self, user_id: &str, content: &str) -> AppResult<usize> {
        Ok(self.stats_for(user_id, content).await?.sentence_count)
    }

    pub async fn paragraph_count(&self, user_id: &str, content: &str) -> AppResult<usize> {
        Ok(self.stats_for(user_id, content).await?.paragraph_count)
    }

    pub async fn longest_words(&self, user_id: &str, content: &str) -> AppResult<Vec<String>> {
        Ok(self.stats_for(user_id, content).await?.longest_words)
    }

    pub async fn records_for_user(&self, user_id: &str) -> AppResult<Vec<TextAnalysisRecord>> {
        let records = self.repository.find_all_by_user_id(user_id).await?;
        tracing::debug!(user_id, count = records.len(), "Fetched analyses");
        Ok(records)
    }

    /// A record owned by `user_id`; records of other users are reported as
    /// missing.
    pub async fn record(&self, user_id: &str, id: Uuid) -> AppResult<TextAnalysisRecord> {
        self.repository
            .find_by_id(id)
            .await?
            .filter(|record| record.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("Analysis {}", id)))
    }

    pub async fn delete_record(&self, user_id: &str, id: Uuid) -> AppResult<()> {
        self.record(user_id, id).await?;
        if self.repository.delete_by_id(id).await? {
            tracing::info!(user_id, record_id = %id, "Text analysis deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Analysis {}", id)))
        }
    }

    async fn stats_for(&self, user_id: &str, content: &str) -> AppResult<TextStats> {
        let normalized = normalize(content);
        let key = cache_key(user_id, &normalized);

        if !key.is_empty() {
            match self.cache.get(&key).await {
                Ok(Some(stats)) => {
                    self.metrics.record_cache(true);
                    tracing::info!(user_id, "Cache hit");
                    return Ok(stats);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(user_id, error = %err, "Cache read failed, computing stats");
                }
            }
            self.metrics.record_cache(false);
            tracing::info!(user_id, "Cache miss, analyzing text");
        }

        let stats = compute(normalized).await?;

        if !key.is_empty() {
            if let Err(err) = self.cache.set(&key, &stats, self.cache_ttl).await {
                tracing::warn!(user_id, error = %err, "Cache write failed");
            }
        }

        Ok(stats)
    }
}

/// Runs the CPU-bound counting off the async workers.
async fn compute(normalized: String) -> AppResult<TextStats> {
    tokio::task::spawn_blocking(move || TextStats::from_normalized(&normalized))
        .await
        .map_err(|err| AppError::Computation(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryStatsCache;
    use crate::repository::InMemoryAnalysisRepository;
    use async_trait::async_trait;

    struct FailingRepository;

    #[async_trait]
    impl AnalysisRepository for FailingRepository {
        async fn create(&self, _: &str, _: &str, _: &TextStats) -> AppResult<TextAnalysisRecord> {
            Err(AppError::Upstream("database unavailable".into()))
        }

        async fn find_all_by_user_id(&self, _: &str) -> AppResult<Vec<TextAnalysisRecord>> {
            Err(AppError::Upstream("database unavailable".into()))
        }

        async fn find_by_id(&self, _: Uuid) -> AppResult<Option<TextAnalysisRecord>> {
            Ok(None)
        }

        async fn delete_by_id(&self, _: Uuid) -> AppResult<bool> {
            Ok(false)
        }
    }

    struct FailingCache;

    #[async_trait]
    impl StatsCache for FailingCache {
        async fn get(&self, _: &str) -> AppResult<Option<TextStats>> {
            Err(AppError::Upstream("cache unavailable".into()))
        }

        async fn set(&self, _: &str, _: &TextStats, _: Option<Duration>) -> AppResult<()> {
            Err(AppError::Upstream("cache unavailable".into()))
        }
    }

    struct Fixture {
        service: TextAnalyzerService,
        repository: Arc<InMemoryAnalysisRepository>,
        cache: Arc<InMemoryStatsCache>,
        metrics: Arc<Metrics>,
    }

    fn fixture() -> Fixture {
        let repository = Arc::new(InMemoryAnalysisRepository::new());
        let cache = Arc::new(InMemoryStatsCache::new());
        let metrics = Arc::new(Metrics::new());
        let service = TextAnalyzerService::new(
            repository.clone(),
            cache.clone(),
            None,
            metrics.clone(),
        );
        Fixture {
            service,
            repository,
            cache,
            metrics,
        }
    }

    #[tokio::test]
    async fn test_miss_computes_caches_and_persists() {
        let f = fixture();
        let content =
            "The quick brown fox jumps over the lazy dog. The lazy dog slept in the sun.";

        let stats = f.service.analyze_text("user-1", content).await.unwrap();
        assert_eq!(stats.word_count, 16);

        let cached = f.cache.get(&cache_key("user-1", content)).await.unwrap();
        assert_eq!(cached, Some(stats.clone()));

        let records = f.repository.find_all_by_user_id("user-1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, content);
        assert_eq!(records[0].stats, stats);
    }

    #[tokio::test]
    async fn test_hit_returns_cached_value_and_still_persists() {
        let f = fixture();
        let content = "hello world";
        // Deliberately wrong numbers: only a cache read can produce them.
        let planted = TextStats {
            word_count: 999,
            ..TextStats::default()
        };
        f.cache
            .set(&cache_key("user-1", content), &planted, None)
            .await
            .unwrap();

        let stats = f.service.analyze_text("user-1", "  hello   world ").await.unwrap();
        assert_eq!(stats, planted);
        assert_eq!(f.repository.find_all_by_user_id("user-1").await.unwrap().len(), 1);
        assert_eq!(f.metrics.snapshot().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_cache_is_per_user() {
        let f = fixture();
        f.service.word_count("alice", "one two").await.unwrap();
        f.service.word_count("bob", "one two").await.unwrap();
        assert_eq!(f.cache.len(), 2);
        assert_eq!(f.metrics.snapshot().cache_misses, 2);
    }

    #[tokio::test]
    async fn test_individual_metrics_do_not_persist() {
        let f = fixture();
        assert_eq!(
            f.service.longest_words("u", "hello world words").await.unwrap(),
            vec!["hello", "world", "words"]
        );
        let sentences = f.service.sentence_count("u", "Hello! How are you? I am fine.");
        assert_eq!(sentences.await.unwrap(), 3);
        let text = "First paragraph.\n\n\nSecond paragraph.\n\n\nThird paragraph.";
        assert_eq!(f.service.paragraph_count("u", text).await.unwrap(), 3);
        assert_eq!(f.service.character_count("u", "a b c").await.unwrap(), 3);
        assert!(f.repository.find_all_by_user_id("u").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_user_skips_cache() {
        let f = fixture();
        let stats = f.service.analyze_text("", "some text").await.unwrap();
        assert_eq!(stats.word_count, 2);
        assert!(f.cache.is_empty());
        // The cache was never consulted, so neither a hit nor a miss is counted.
        let snapshot = f.metrics.snapshot();
        assert_eq!(snapshot.cache_hits, 0);
        assert_eq!(snapshot.cache_misses, 0);
    }

    #[tokio::test]
    async fn test_empty_content_yields_zero_stats() {
        let f = fixture();
        let stats = f.service.analyze_text("u", "").await.unwrap();
        assert_eq!(stats, TextStats::default());
        assert!(f.cache.is_empty());
        assert_eq!(f.metrics.snapshot().cache_misses, 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_still_returns_stats() {
        let metrics = Arc::new(Metrics::new());
        let service = TextAnalyzerService::new(
            Arc::new(FailingRepository),
            Arc::new(InMemoryStatsCache::new()),
            None,
            metrics.clone(),
        );

        let stats = service.analyze_text("u", "still works").await.unwrap();
        assert_eq!(stats.word_count, 2);
        assert_eq!(metrics.snapshot().persistence_failures, 1);
    }

    #[tokio::test]
    async fn test_history_read_failure_propagates() {
        let service = TextAnalyzerService::new(
            Arc::new(FailingRepository),
            Arc::new(InMemoryStatsCache::new()),
            None,
            Arc::new(Metrics::new()),
        );
        assert!(matches!(
            service.records_for_user("u").await,
            Err(AppError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_cache_failure_falls_back_to_computation() {
        let service = TextAnalyzerService::new(
            Arc::new(InMemoryAnalysisRepository::new()),
            Arc::new(FailingCache),
            None,
            Arc::new(Metrics::new()),
        );
        tokio_test::assert_ok!(service.word_count("u", "three little words").await);
    }

    #[tokio::test]
    async fn test_record_lookup_is_owner_scoped() {
        let f = fixture();
        f.service.analyze_text("alice", "mine").await.unwrap();
        let id = f.repository.find_all_by_user_id("alice").await.unwrap()[0].id;

        assert_eq!(f.service.record("alice", id).await.unwrap().id, id);
        assert!(matches!(f.service.record("bob", id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            f.service.delete_record("bob", id).await,
            Err(AppError::NotFound(_))
        ));

        f.service.delete_record("alice", id).await.unwrap();
        assert!(matches!(f.service.record("alice", id).await, Err(AppError::NotFound(_))));
    }
}
