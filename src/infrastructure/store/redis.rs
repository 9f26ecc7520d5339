//! Redis entry store implementation

use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::tool_cache::{CacheEntry, EntryStore, EvictionPolicy, TouchKind};
use crate::domain::DomainError;

/// Configuration for the Redis entry store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "tool_recall".to_string(),
        }
    }
}

impl RedisStoreConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}

/// Redis entry store.
///
/// Layout per entry:
/// - `{prefix}:entry:{id}` hash with an immutable `json` field plus
///   `reuse_count`, `context_count` and `last_accessed_at` fields, so
///   counter bumps are single atomic `HINCRBY` commands.
/// - `{prefix}:scores` ZSET mapping entry id to its eviction score.
#[derive(Clone)]
pub struct RedisEntryStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisEntryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisEntryStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisEntryStore {
    /// Creates a new Redis entry store
    pub async fn new(config: RedisStoreConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::storage(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    /// Creates a store with default configuration for the given URL
    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RedisStoreConfig::new(url)).await
    }

    fn entry_key(&self, id: &str) -> String {
        format!("{}:entry:{}", self.config.key_prefix, id)
    }

    fn scores_key(&self) -> String {
        format!("{}:scores", self.config.key_prefix)
    }

    fn storage_err(operation: &str, e: impl fmt::Display) -> DomainError {
        DomainError::storage(format!("Redis {} failed: {}", operation, e))
    }

    /// Rebuild a `CacheEntry` from the stored hash: the immutable JSON
    /// snapshot overlaid with the live counter and timestamp fields.
    fn entry_from_fields(
        json: String,
        reuse_count: Option<u64>,
        context_count: Option<u64>,
        last_accessed_at: Option<String>,
    ) -> Result<CacheEntry, DomainError> {
        let mut value: serde_json::Value = serde_json::from_str(&json)
            .map_err(|e| DomainError::storage(format!("Corrupt cache entry: {}", e)))?;

        if let Some(reuse) = reuse_count {
            value["reuse_count"] = serde_json::json!(reuse);
        }
        if let Some(context) = context_count {
            value["context_count"] = serde_json::json!(context);
        }
        if let Some(accessed) = last_accessed_at {
            value["last_accessed_at"] = serde_json::json!(accessed);
        }

        serde_json::from_value(value)
            .map_err(|e| DomainError::storage(format!("Corrupt cache entry: {}", e)))
    }

    async fn fetch_entry(&self, id: &str) -> Result<Option<CacheEntry>, DomainError> {
        let mut conn = self.connection.clone();
        let key = self.entry_key(id);

        let fields: (
            Option<String>,
            Option<u64>,
            Option<u64>,
            Option<String>,
        ) = redis::cmd("HMGET")
            .arg(&key)
            .arg("json")
            .arg("reuse_count")
            .arg("context_count")
            .arg("last_accessed_at")
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::storage_err("HMGET", e))?;

        match fields.0 {
            Some(json) => Ok(Some(Self::entry_from_fields(
                json, fields.1, fields.2, fields.3,
            )?)),
            None => Ok(None),
        }
    }

    /// Fill the remaining victim slots from boundary-score ties,
    /// oldest creation time first.
    fn fill_from_ties(
        mut victims: Vec<String>,
        mut ties: Vec<(String, chrono::DateTime<Utc>)>,
        n: usize,
    ) -> Vec<String> {
        ties.sort_by_key(|(_, created_at)| *created_at);

        let remaining = n.saturating_sub(victims.len());
        victims.extend(ties.into_iter().take(remaining).map(|(id, _)| id));

        victims
    }

    async fn all_entries(&self) -> Result<Vec<CacheEntry>, DomainError> {
        let ids = EntryStore::ids(self).await?;
        let mut entries = Vec::with_capacity(ids.len());

        for id in ids {
            if let Some(entry) = self.fetch_entry(&id).await? {
                entries.push(entry);
            }
        }

        Ok(entries)
    }
}

#[async_trait]
impl EntryStore for RedisEntryStore {
    async fn get(&self, id: &str) -> Result<Option<CacheEntry>, DomainError> {
        self.fetch_entry(id).await
    }

    async fn insert(&self, entry: CacheEntry, score: f64) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();
        let key = self.entry_key(entry.id());

        let json = serde_json::to_string(&entry)
            .map_err(|e| DomainError::internal(format!("Failed to serialize entry: {}", e)))?;

        // HSETNX decides the winner under concurrent inserts of the
        // same id; the loser leaves the stored entry untouched.
        let inserted: bool = conn
            .hset_nx(&key, "json", &json)
            .await
            .map_err(|e| Self::storage_err("HSETNX", e))?;

        if !inserted {
            return Ok(false);
        }

        let () = redis::pipe()
            .atomic()
            .hset(&key, "reuse_count", entry.reuse_count())
            .hset(&key, "context_count", entry.context_count())
            .hset(&key, "last_accessed_at", entry.last_accessed_at().to_rfc3339())
            .zadd(self.scores_key(), entry.id(), score)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::storage_err("insert pipeline", e))?;

        Ok(true)
    }

    async fn touch(&self, id: &str, kind: TouchKind) -> Result<Option<CacheEntry>, DomainError> {
        let mut conn = self.connection.clone();
        let key = self.entry_key(id);

        let exists: bool = conn
            .hexists(&key, "json")
            .await
            .map_err(|e| Self::storage_err("HEXISTS", e))?;

        if !exists {
            return Ok(None);
        }

        let field = match kind {
            TouchKind::Reuse => "reuse_count",
            TouchKind::Context => "context_count",
        };

        let () = redis::pipe()
            .atomic()
            .hincr(&key, field, 1)
            .hset(&key, "last_accessed_at", Utc::now().to_rfc3339())
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::storage_err("touch pipeline", e))?;

        self.fetch_entry(id).await
    }

    async fn update_score(&self, id: &str, score: f64) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let exists: bool = conn
            .hexists(self.entry_key(id), "json")
            .await
            .map_err(|e| Self::storage_err("HEXISTS", e))?;

        if !exists {
            return Ok(false);
        }

        let () = conn
            .zadd(self.scores_key(), id, score)
            .await
            .map_err(|e| Self::storage_err("ZADD", e))?;

        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let (removed, _): (i64, i64) = redis::pipe()
            .atomic()
            .del(self.entry_key(id))
            .zrem(self.scores_key(), id)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::storage_err("delete pipeline", e))?;

        Ok(removed > 0)
    }

    async fn exists(&self, id: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        conn.hexists(self.entry_key(id), "json")
            .await
            .map_err(|e| Self::storage_err("HEXISTS", e))
    }

    async fn len(&self) -> Result<usize, DomainError> {
        let mut conn = self.connection.clone();

        let count: usize = conn
            .zcard(self.scores_key())
            .await
            .map_err(|e| Self::storage_err("ZCARD", e))?;

        Ok(count)
    }

    async fn evict_candidates(
        &self,
        policy: EvictionPolicy,
        n: usize,
    ) -> Result<Vec<String>, DomainError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        match policy {
            EvictionPolicy::Score => {
                let mut conn = self.connection.clone();

                // Bottom n of the ZSET; everything strictly below the
                // boundary score is a victim outright.
                let window: Vec<(String, f64)> = conn
                    .zrange_withscores(self.scores_key(), 0, n as isize - 1)
                    .await
                    .map_err(|e| Self::storage_err("ZRANGE", e))?;

                let Some(boundary) = window.last().map(|(_, score)| *score) else {
                    return Ok(Vec::new());
                };

                let victims: Vec<String> = window
                    .into_iter()
                    .filter(|(_, score)| *score < boundary)
                    .map(|(id, _)| id)
                    .collect();

                // All members at the boundary score compete on
                // creation time, including those outside the window.
                let tied_ids: Vec<String> = conn
                    .zrangebyscore(self.scores_key(), boundary, boundary)
                    .await
                    .map_err(|e| Self::storage_err("ZRANGEBYSCORE", e))?;

                let mut ties = Vec::with_capacity(tied_ids.len());
                for id in tied_ids {
                    match self.fetch_entry(&id).await? {
                        Some(entry) => ties.push((id, entry.created_at())),
                        // Dangling score with no entry: evict first
                        None => ties.push((id, chrono::DateTime::<Utc>::MIN_UTC)),
                    }
                }

                Ok(Self::fill_from_ties(victims, ties, n))
            }
            EvictionPolicy::Lru => {
                let mut entries = self.all_entries().await?;
                entries.sort_by_key(|entry| entry.last_accessed_at());
                Ok(entries
                    .into_iter()
                    .take(n)
                    .map(|entry| entry.id().to_string())
                    .collect())
            }
            EvictionPolicy::Lfu => {
                let mut entries = self.all_entries().await?;
                entries.sort_by_key(|entry| (entry.total_reference_count(), entry.created_at()));
                Ok(entries
                    .into_iter()
                    .take(n)
                    .map(|entry| entry.id().to_string())
                    .collect())
            }
            EvictionPolicy::Fifo => {
                let mut entries = self.all_entries().await?;
                entries.sort_by_key(|entry| entry.created_at());
                Ok(entries
                    .into_iter()
                    .take(n)
                    .map(|entry| entry.id().to_string())
                    .collect())
            }
        }
    }

    async fn ids(&self) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();

        let ids: Vec<String> = conn
            .zrange(self.scores_key(), 0, -1)
            .await
            .map_err(|e| Self::storage_err("ZRANGE", e))?;

        Ok(ids)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let ids = EntryStore::ids(self).await?;
        let mut conn = self.connection.clone();

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.del(self.entry_key(id));
        }
        pipe.del(self.scores_key());

        let () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::storage_err("clear pipeline", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RedisStoreConfig::default();

        assert_eq!(config.url, "redis://127.0.0.1:6379");
        assert_eq!(config.key_prefix, "tool_recall");
    }

    #[test]
    fn test_config_builder() {
        let config = RedisStoreConfig::new("redis://cache:6379").with_key_prefix("agent");

        assert_eq!(config.url, "redis://cache:6379");
        assert_eq!(config.key_prefix, "agent");
    }

    #[test]
    fn test_entry_from_fields_overlays_counters() {
        let entry = CacheEntry::new(
            "abc",
            "search",
            r#"{"q":"rust"}"#,
            vec![0.1],
            serde_json::json!("ok"),
        );
        let json = serde_json::to_string(&entry).unwrap();

        let rebuilt = RedisEntryStore::entry_from_fields(
            json,
            Some(7),
            Some(3),
            Some(Utc::now().to_rfc3339()),
        )
        .unwrap();

        assert_eq!(rebuilt.reuse_count(), 7);
        assert_eq!(rebuilt.context_count(), 3);
        assert_eq!(rebuilt.id(), "abc");
    }

    #[test]
    fn test_boundary_score_ties_evict_oldest_first() {
        let now = Utc::now();
        let older = now - chrono::Duration::hours(2);

        let victims = RedisEntryStore::fill_from_ties(
            vec!["below".to_string()],
            vec![("tie_new".to_string(), now), ("tie_old".to_string(), older)],
            2,
        );

        assert_eq!(victims, vec!["below", "tie_old"]);
    }

    #[test]
    fn test_tie_fill_never_exceeds_requested_count() {
        let now = Utc::now();

        let victims = RedisEntryStore::fill_from_ties(
            Vec::new(),
            vec![
                ("a".to_string(), now),
                ("b".to_string(), now - chrono::Duration::minutes(1)),
                ("c".to_string(), now - chrono::Duration::minutes(2)),
            ],
            2,
        );

        assert_eq!(victims, vec!["c", "b"]);
    }
}
