//! Cache decision engine
//!
//! Classifies incoming tool calls against previously recorded ones and
//! orchestrates the entry store and vector index. Adapter failures and
//! timeouts never propagate out of `decide`: the engine fails open to
//! a miss so the intercepted tool call always proceeds.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::tool_cache::{
    scoring, signature, CacheEntry, CacheHit, CacheStats, Decision, EntryStore, ToolCacheConfig,
    TouchKind, VectorIndex,
};
use crate::domain::DomainError;

/// Upper bound on a single embedding or index call
const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(5);

/// Attempts for the entry store write during `record`
const RECORD_WRITE_ATTEMPTS: usize = 3;

/// Semantic cache engine for tool calls.
///
/// One instance is constructed at service startup and shared by
/// reference; there is no implicit global.
#[derive(Debug)]
pub struct ToolCacheService {
    store: Arc<dyn EntryStore>,
    index: Arc<dyn VectorIndex>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    embedding_model: String,
    config: ToolCacheConfig,
    adapter_timeout: Duration,
    // Capacity checks and victim selection must not race each other;
    // entry-level mutations stay lock-free.
    eviction_lock: Mutex<()>,
}

impl ToolCacheService {
    /// Create a service with the default configuration
    pub fn new(
        store: Arc<dyn EntryStore>,
        index: Arc<dyn VectorIndex>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, DomainError> {
        Self::with_config(store, index, embedding_provider, ToolCacheConfig::default())
    }

    /// Create a service with a custom configuration. Fails immediately
    /// if the configuration is invalid.
    pub fn with_config(
        store: Arc<dyn EntryStore>,
        index: Arc<dyn VectorIndex>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        config: ToolCacheConfig,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        let embedding_model = embedding_provider.default_model().to_string();

        Ok(Self {
            store,
            index,
            embedding_provider,
            embedding_model,
            config,
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
            eviction_lock: Mutex::new(()),
        })
    }

    /// Override the embedding model
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Override the adapter timeout
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &ToolCacheConfig {
        &self.config
    }

    async fn embed_signature(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let request = EmbeddingRequest::single(&self.embedding_model, text);

        let response = timeout(self.adapter_timeout, self.embedding_provider.embed(request))
            .await
            .map_err(|_| {
                DomainError::provider(
                    self.embedding_provider.provider_name(),
                    format!("Embedding timed out after {:?}", self.adapter_timeout),
                )
            })??;

        response
            .first()
            .map(|e| e.vector().to_vec())
            .ok_or_else(|| {
                DomainError::provider(
                    self.embedding_provider.provider_name(),
                    "No embedding returned",
                )
            })
    }

    /// Stored eviction score for an entry: the composite score at full
    /// similarity, so it ranks entries purely by references and recency.
    fn stored_score(&self, entry: &CacheEntry) -> f64 {
        scoring::weighted_score(
            1.0,
            entry.reuse_count(),
            entry.context_count(),
            entry.last_accessed_at(),
            &self.config,
        )
    }

    /// Search for cached calls similar to `args` within the tool's
    /// namespace. Hits below `similarity_threshold` are dropped;
    /// results are ordered by composite score descending.
    pub async fn search(
        &self,
        tool_name: &str,
        args: &serde_json::Value,
    ) -> Result<Vec<CacheHit>, DomainError> {
        let query_text = signature::canonical_signature(args);
        let vector = self.embed_signature(&query_text).await?;

        let mut hits = self.lookup_candidates(tool_name, &vector).await?;

        hits.sort_by(|a, b| {
            b.weighted_score
                .partial_cmp(&a.weighted_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(hits)
    }

    /// Fetch top-K index matches and join them against the entry
    /// store. A match without a stored entry is a leftover from an
    /// interrupted removal; its vector is deleted on sight.
    async fn lookup_candidates(
        &self,
        tool_name: &str,
        vector: &[f32],
    ) -> Result<Vec<CacheHit>, DomainError> {
        let matches = timeout(
            self.adapter_timeout,
            self.index.search(tool_name, vector, self.config.top_k),
        )
        .await
        .map_err(|_| {
            DomainError::cache(format!(
                "Index search timed out after {:?}",
                self.adapter_timeout
            ))
        })??;

        let mut hits = Vec::with_capacity(matches.len());

        for m in matches {
            let Some(entry) = self.store.get(&m.id).await? else {
                debug!(id = %m.id, tool = tool_name, "Dropping dangling index vector");
                if let Err(e) = self.index.delete(tool_name, &m.id).await {
                    warn!(id = %m.id, "Failed to drop dangling index vector: {}", e);
                }
                continue;
            };

            if m.similarity < self.config.similarity_threshold {
                continue;
            }

            let weighted_score = scoring::weighted_score(
                m.similarity,
                entry.reuse_count(),
                entry.context_count(),
                entry.last_accessed_at(),
                &self.config,
            );

            hits.push(CacheHit::new(entry, m.similarity, weighted_score));
        }

        Ok(hits)
    }

    /// Classify an incoming call. Never fails: any adapter error or
    /// timeout degrades to [`Decision::Miss`] so the caller can simply
    /// execute the tool.
    pub async fn decide(&self, tool_name: &str, args: &serde_json::Value) -> Decision {
        let query_text = signature::canonical_signature(args);

        let vector = match self.embed_signature(&query_text).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(tool = tool_name, "Embedding unavailable, treating as miss: {}", e);
                return Decision::Miss;
            }
        };

        self.decide_vector(tool_name, &vector).await
    }

    /// Classify an incoming call from an already-computed query vector.
    pub async fn decide_vector(&self, tool_name: &str, vector: &[f32]) -> Decision {
        let mut hits = match self.lookup_candidates(tool_name, vector).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(tool = tool_name, "Cache lookup failed, treating as miss: {}", e);
                return Decision::Miss;
            }
        };

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let best_similarity = match hits.first() {
            Some(best) => best.similarity,
            None => return Decision::Miss,
        };

        // Boundary values route to the stricter bucket: exactly
        // reuse_threshold is a reuse, exactly similarity_threshold is
        // a context hint.
        if best_similarity >= self.config.reuse_threshold {
            let hit = hits.swap_remove(0);
            let touched = self.touch_and_rescore(&hit, TouchKind::Reuse).await;

            debug!(
                tool = tool_name,
                id = %touched.entry.id(),
                similarity = touched.similarity,
                "Cache reuse"
            );

            return Decision::Reuse(touched);
        }

        if best_similarity >= self.config.similarity_threshold {
            let band: Vec<CacheHit> = hits
                .into_iter()
                .filter(|hit| hit.similarity < self.config.reuse_threshold)
                .filter(|hit| hit.entry.success())
                .collect();

            if band.is_empty() {
                return Decision::Miss;
            }

            let mut touched = Vec::with_capacity(band.len());
            for hit in band {
                touched.push(self.touch_and_rescore(&hit, TouchKind::Context).await);
            }

            debug!(tool = tool_name, hints = touched.len(), "Cache context assist");

            return Decision::ContextAssist(touched);
        }

        Decision::Miss
    }

    /// Bump the entry's counter, refresh its access time and persist
    /// the recomputed score. Failures are logged and the pre-touch
    /// entry is returned; a hit is still a hit.
    async fn touch_and_rescore(&self, hit: &CacheHit, kind: TouchKind) -> CacheHit {
        match self.store.touch(hit.entry.id(), kind).await {
            Ok(Some(updated)) => {
                let score = self.stored_score(&updated);
                if let Err(e) = self.store.update_score(updated.id(), score).await {
                    warn!(id = %updated.id(), "Failed to persist score: {}", e);
                }

                CacheHit::new(updated, hit.similarity, hit.weighted_score)
            }
            Ok(None) => {
                debug!(id = %hit.entry.id(), "Entry evicted between lookup and touch");
                hit.clone()
            }
            Err(e) => {
                warn!(id = %hit.entry.id(), "Failed to touch entry: {}", e);
                hit.clone()
            }
        }
    }

    /// Record a freshly executed tool call as a new cache entry.
    ///
    /// Never overwrites: an entry with the same tool and signature is
    /// returned as-is. The index write happens first; if the store
    /// write keeps failing after bounded retries the vector is removed
    /// again so no half-applied entry survives.
    pub async fn record(
        &self,
        tool_name: &str,
        args: &serde_json::Value,
        result: serde_json::Value,
        success: bool,
    ) -> Result<CacheEntry, DomainError> {
        let query_text = signature::canonical_signature(args);
        let id = signature::entry_id(tool_name, &query_text);

        if let Some(existing) = self.store.get(&id).await? {
            debug!(id = %id, tool = tool_name, "Signature already recorded");
            return Ok(existing);
        }

        let vector = self.embed_signature(&query_text).await?;

        let entry = CacheEntry::new(&id, tool_name, &query_text, vector.clone(), result)
            .with_success(success);
        let score = self.stored_score(&entry);

        timeout(
            self.adapter_timeout,
            self.index.upsert(tool_name, &id, vector),
        )
        .await
        .map_err(|_| {
            DomainError::cache(format!(
                "Index upsert timed out after {:?}",
                self.adapter_timeout
            ))
        })??;

        let mut last_error = None;
        let mut inserted = false;

        for attempt in 1..=RECORD_WRITE_ATTEMPTS {
            match self.store.insert(entry.clone(), score).await {
                Ok(_) => {
                    inserted = true;
                    break;
                }
                Err(e) => {
                    warn!(
                        id = %id,
                        attempt,
                        "Entry store write failed: {}",
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        if !inserted {
            // Compensating delete keeps index and store consistent
            if let Err(e) = self.index.delete(tool_name, &id).await {
                warn!(id = %id, "Failed to roll back index write: {}", e);
            }

            return Err(last_error
                .unwrap_or_else(|| DomainError::storage("Entry store write failed")));
        }

        if let Err(e) = self.evict_over_capacity().await {
            warn!("Eviction pass failed: {}", e);
        }

        Ok(entry)
    }

    /// Remove lowest-ranked entries until the cache fits its capacity.
    /// Runs under the eviction lock; victims already removed by a
    /// concurrent pass are skipped silently.
    async fn evict_over_capacity(&self) -> Result<(), DomainError> {
        let _guard = self.eviction_lock.lock().await;

        let total = self.store.len().await?;
        if total <= self.config.max_cache_size {
            return Ok(());
        }

        let excess = total - self.config.max_cache_size;
        let victims = self
            .store
            .evict_candidates(self.config.eviction_policy, excess)
            .await?;

        for id in victims {
            // Namespace is needed for the index delete, so read the
            // entry before removing it.
            let Some(entry) = self.store.get(&id).await? else {
                continue;
            };

            let deleted = self.store.delete(&id).await?;
            if deleted {
                debug!(id = %id, tool = entry.tool_name(), "Evicted cache entry");
            }

            if let Err(e) = self.index.delete(entry.tool_name(), &id).await {
                warn!(id = %id, "Failed to delete evicted vector: {}", e);
            }
        }

        Ok(())
    }

    /// Aggregate statistics over all stored entries
    pub async fn stats(&self) -> Result<CacheStats, DomainError> {
        let ids = self.store.ids().await?;
        let mut stats = CacheStats::default();

        for id in &ids {
            let Some(entry) = self.store.get(id).await? else {
                continue;
            };

            stats.total_entries += 1;
            stats.total_reuse_count += entry.reuse_count();
            stats.total_context_count += entry.context_count();
            stats.max_reference_count = stats
                .max_reference_count
                .max(entry.total_reference_count());
        }

        stats.total_references = stats.total_reuse_count + stats.total_context_count;
        if stats.total_entries > 0 {
            stats.avg_reference_count =
                stats.total_references as f64 / stats.total_entries as f64;
        }

        Ok(stats)
    }

    /// Remove every entry from both the store and the index
    pub async fn clear(&self) -> Result<(), DomainError> {
        self.store.clear().await?;
        self.index.clear().await?;

        Ok(())
    }
}
