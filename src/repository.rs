//! Append-only storage of analysis records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::redis::RedisClient;
use crate::text_stats::TextStats;
use crate::text_utils::content_hash;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnalysisRecord {
    pub id: Uuid,
    pub content: String,
    pub content_hash: String,
    pub user_id: String,
    pub stats: TextStats,
    /// Milliseconds since the Unix epoch
    pub created_at: u64,
    pub updated_at: u64,
}

impl TextAnalysisRecord {
    pub fn new(user_id: &str, content: &str, stats: &TextStats) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            id: Uuid::new_v4(),
            content: content.to_string(),
            content_hash: content_hash(content),
            user_id: user_id.to_string(),
            stats: stats.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    async fn create(
        &self,
        user_id: &str,
        content: &str,
        stats: &TextStats,
    ) -> AppResult<TextAnalysisRecord>;

    /// Records of `user_id`, oldest first.
    async fn find_all_by_user_id(&self, user_id: &str) -> AppResult<Vec<TextAnalysisRecord>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<TextAnalysisRecord>>;

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Default)]
struct Store {
    records: HashMap<Uuid, TextAnalysisRecord>,
    by_user: HashMap<String, Vec<Uuid>>,
}

#[derive(Default)]
pub struct InMemoryAnalysisRepository {
    store: RwLock<Store>,
}

impl InMemoryAnalysisRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisRepository for InMemoryAnalysisRepository {
    async fn create(
        &self,
        user_id: &str,
        content: &str,
        stats: &TextStats,
    ) -> AppResult<TextAnalysisRecord> {
        let record = TextAnalysisRecord::new(user_id, content, stats);
        let mut store = self.store.write().await;
        store
            .by_user
            .entry(record.user_id.clone())
            .or_default()
            .push(record.id);
        store.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_all_by_user_id(&self, user_id: &str) -> AppResult<Vec<TextAnalysisRecord>> {
        let store = self.store.read().await;
        let records = store
            .by_user
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| store.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<TextAnalysisRecord>> {
        Ok(self.store.read().await.records.get(&id).cloned())
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let Some(record) = store.records.remove(&id) else {
            return Ok(false);
        };
        if let Some(ids) = store.by_user.get_mut(&record.user_id) {
            ids.retain(|existing| *existing != id);
        }
        Ok(true)
    }
}

/// Records as JSON strings, with a per-user list of ids.
pub struct RedisAnalysisRepository {
    client: RedisClient,
}

impl RedisAnalysisRepository {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn record_key(id: Uuid) -> String {
        format!("text-analysis:record:{}", id)
    }

    fn user_key(user_id: &str) -> String {
        format!("text-analysis:user:{}:records", user_id)
    }
}

#[async_trait]
impl AnalysisRepository for RedisAnalysisRepository {
    async fn create(
        &self,
        user_id: &str,
        content: &str,
        stats: &TextStats,
    ) -> AppResult<TextAnalysisRecord> {
        let record = TextAnalysisRecord::new(user_id, content, stats);
        let raw = serde_json::to_string(&record)?;
        self.client.set(&Self::record_key(record.id), &raw).await?;
        self.client
            .rpush(&Self::user_key(user_id), &record.id.to_string())
            .await?;
        Ok(record)
    }

    async fn find_all_by_user_id(&self, user_id: &str) -> AppResult<Vec<TextAnalysisRecord>> {
        let ids = self.client.lrange_all(&Self::user_key(user_id)).await?;
        let keys: Vec<String> = ids
            .iter()
            .filter_map(|id| Uuid::parse_str(id).ok())
            .map(Self::record_key)
            .collect();

        let mut records = Vec::with_capacity(keys.len());
        // Ids whose record was deleted come back as nil and are skipped.
        for raw in self.client.mget(&keys).await?.into_iter().flatten() {
            records.push(serde_json::from_str(&raw)?);
        }
        Ok(records)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<TextAnalysisRecord>> {
        match self.client.get(&Self::record_key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool> {
        let Some(record) = self.find_by_id(id).await? else {
            return Ok(false);
        };
        let deleted = self.client.delete(&Self::record_key(id)).await?;
        self.client
            .lrem(&Self::user_key(&record.user_id), &id.to_string())
            .await?;
        Ok(deleted)
    }
}
