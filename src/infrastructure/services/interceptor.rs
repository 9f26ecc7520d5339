//! Tool call interceptor
//!
//! Wraps tool execution with the cache decision engine: reuse hits
//! short-circuit execution, context hits are passed to the tool as
//! hints, and fresh results are recorded for next time. Cache failures
//! are logged and swallowed so the wrapped tool call never fails
//! because of the cache.

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;

use tracing::{debug, error, warn};

use super::ToolCacheService;
use crate::domain::tool_cache::{CacheHit, Decision, InterceptorStats};
use crate::domain::DomainError;

/// Outcome of a real tool execution handed back to the interceptor
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    result: serde_json::Value,
    success: bool,
}

impl ToolOutcome {
    /// A successful execution
    pub fn ok(result: serde_json::Value) -> Self {
        Self {
            result,
            success: true,
        }
    }

    /// An execution that completed but reported failure. The result is
    /// still recorded so failed calls are never surfaced as hints.
    pub fn failed(result: serde_json::Value) -> Self {
        Self {
            result,
            success: false,
        }
    }

    /// Get the result payload
    pub fn result(&self) -> &serde_json::Value {
        &self.result
    }

    /// Whether the execution succeeded
    pub fn success(&self) -> bool {
        self.success
    }
}

/// Intercepts tool calls on behalf of an agent loop.
#[derive(Debug)]
pub struct ToolInterceptor {
    cache: Arc<ToolCacheService>,
    stats: Mutex<InterceptorStats>,
}

impl ToolInterceptor {
    /// Create an interceptor over a cache service
    pub fn new(cache: Arc<ToolCacheService>) -> Self {
        Self {
            cache,
            stats: Mutex::new(InterceptorStats::default()),
        }
    }

    /// Get the underlying cache service
    pub fn cache(&self) -> &ToolCacheService {
        &self.cache
    }

    /// Run a tool call through the cache.
    ///
    /// `execute` receives `Some(hints)` when similar previous calls
    /// exist, `None` otherwise. It is not called at all when a cached
    /// result substitutes for execution. Errors from `execute`
    /// propagate unchanged; nothing is recorded for them.
    pub async fn invoke<F, Fut>(
        &self,
        tool_name: &str,
        args: &serde_json::Value,
        execute: F,
    ) -> Result<serde_json::Value, DomainError>
    where
        F: FnOnce(Option<Vec<CacheHit>>) -> Fut,
        Fut: Future<Output = Result<ToolOutcome, DomainError>> + Send,
    {
        let decision = self.cache.decide(tool_name, args).await;

        let hints = match decision {
            Decision::Reuse(hit) => {
                debug!(tool = tool_name, id = %hit.entry.id(), "Serving cached result");
                self.bump(|s| s.hits += 1);

                return Ok(hit.entry.result().clone());
            }
            Decision::ContextAssist(hits) => {
                self.bump(|s| {
                    s.misses += 1;
                    s.context_provided += 1;
                });

                Some(hits)
            }
            Decision::Miss => {
                self.bump(|s| s.misses += 1);

                None
            }
        };

        let outcome = execute(hints).await?;

        if let Err(e) = self
            .cache
            .record(tool_name, args, outcome.result.clone(), outcome.success)
            .await
        {
            // A dropped write only costs a future cache hit
            if e.is_recoverable() {
                warn!(tool = tool_name, "Failed to record tool result: {}", e);
            } else {
                error!(tool = tool_name, "Failed to record tool result: {}", e);
            }
        }

        Ok(outcome.result)
    }

    /// Render context hints as a text block a tool or agent prompt can
    /// consume directly.
    pub fn format_context_hints(hints: &[CacheHit]) -> String {
        let mut out = String::from("Results from similar previous tool calls:\n");

        for (i, hit) in hints.iter().enumerate() {
            out.push_str(&format!(
                "{}. (similarity {:.2}) call {} returned: {}\n",
                i + 1,
                hit.similarity,
                hit.entry.query_text(),
                hit.entry.result(),
            ));
        }

        out
    }

    /// Snapshot of the interceptor counters
    pub fn stats(&self) -> InterceptorStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Reset the interceptor counters
    pub fn reset_stats(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            *stats = InterceptorStats::default();
        }
    }

    fn bump(&self, f: impl FnOnce(&mut InterceptorStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::tool_cache::ToolCacheConfig;
    use crate::infrastructure::index::InMemoryVectorIndex;
    use crate::infrastructure::store::InMemoryEntryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn interceptor() -> ToolInterceptor {
        let cache = ToolCacheService::with_config(
            Arc::new(InMemoryEntryStore::new()),
            Arc::new(InMemoryVectorIndex::new()),
            Arc::new(MockEmbeddingProvider::new("mock", 64)),
            ToolCacheConfig::default(),
        )
        .unwrap();

        ToolInterceptor::new(Arc::new(cache))
    }

    #[tokio::test]
    async fn test_miss_executes_and_records() {
        let interceptor = interceptor();
        let args = json!({"query": "rust"});
        let executed = AtomicUsize::new(0);

        let result = interceptor
            .invoke("search", &args, |hints| {
                executed.fetch_add(1, Ordering::SeqCst);
                assert!(hints.is_none());
                async { Ok(ToolOutcome::ok(json!({"results": [1, 2]}))) }
            })
            .await
            .unwrap();

        assert_eq!(result, json!({"results": [1, 2]}));
        assert_eq!(executed.load(Ordering::SeqCst), 1);

        // The identical call is now served from cache
        let cached = interceptor
            .invoke("search", &args, |_| async {
                panic!("must not execute on reuse")
            })
            .await
            .unwrap();

        assert_eq!(cached, json!({"results": [1, 2]}));
    }

    #[tokio::test]
    async fn test_reuse_short_circuits_execution() {
        let interceptor = interceptor();
        let args = json!({"query": "rust"});

        interceptor
            .invoke("search", &args, |_| async {
                Ok(ToolOutcome::ok(json!("fresh")))
            })
            .await
            .unwrap();

        let executed = AtomicBool::new(false);
        let result = interceptor
            .invoke("search", &args, |_| {
                executed.store(true, Ordering::SeqCst);
                async { Ok(ToolOutcome::ok(json!("never"))) }
            })
            .await
            .unwrap();

        assert_eq!(result, json!("fresh"));
        assert!(!executed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_similar_call_gets_hints_and_records_new_entry() {
        use crate::domain::tool_cache::{
            CacheEntry, EntryStore, IndexMatch, VectorIndex,
        };
        use async_trait::async_trait;

        // Index that reports a 0.85 match against the stored entry
        // for any query, so the call lands in the context band.
        #[derive(Debug)]
        struct BandIndex;

        #[async_trait]
        impl VectorIndex for BandIndex {
            async fn upsert(&self, _: &str, _: &str, _: Vec<f32>) -> Result<(), DomainError> {
                Ok(())
            }

            async fn search(
                &self,
                _: &str,
                _: &[f32],
                _: usize,
            ) -> Result<Vec<IndexMatch>, DomainError> {
                Ok(vec![IndexMatch::new("prior", 0.85)])
            }

            async fn delete(&self, _: &str, _: &str) -> Result<bool, DomainError> {
                Ok(true)
            }

            async fn clear(&self) -> Result<(), DomainError> {
                Ok(())
            }
        }

        let store = Arc::new(InMemoryEntryStore::new());
        let prior = CacheEntry::new(
            "prior",
            "search",
            r#"{"query":"rust async"}"#,
            vec![1.0, 0.0],
            json!({"results": ["old"]}),
        );
        store.insert(prior, 1.0).await.unwrap();

        let cache = ToolCacheService::with_config(
            Arc::clone(&store) as Arc<dyn EntryStore>,
            Arc::new(BandIndex),
            Arc::new(MockEmbeddingProvider::new("mock", 2)),
            ToolCacheConfig::default(),
        )
        .unwrap();
        let interceptor = ToolInterceptor::new(Arc::new(cache));

        let result = interceptor
            .invoke("search", &json!({"query": "rust tokio"}), |hints| async move {
                let hints = hints.expect("band hit should surface hints");
                assert_eq!(hints.len(), 1);
                assert_eq!(hints[0].entry.id(), "prior");

                Ok(ToolOutcome::ok(json!({"results": ["new"]})))
            })
            .await
            .unwrap();

        assert_eq!(result, json!({"results": ["new"]}));

        // The prior entry got a context touch and the fresh call was
        // recorded as its own entry.
        let prior = store.get("prior").await.unwrap().unwrap();
        assert_eq!(prior.context_count(), 1);
        assert_eq!(prior.reuse_count(), 0);
        assert_eq!(store.len().await.unwrap(), 2);

        let stats = interceptor.stats();
        assert_eq!(stats.context_provided, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_execute_error_propagates_without_recording() {
        let interceptor = interceptor();
        let args = json!({"query": "rust"});

        let result = interceptor
            .invoke("search", &args, |_| async {
                Err(DomainError::internal("tool crashed"))
            })
            .await;

        assert!(result.is_err());

        // Nothing was recorded, so the retry executes again
        let retried = interceptor
            .invoke("search", &args, |hints| async move {
                assert!(hints.is_none());
                Ok(ToolOutcome::ok(json!("recovered")))
            })
            .await
            .unwrap();

        assert_eq!(retried, json!("recovered"));
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let interceptor = interceptor();
        let args = json!({"query": "rust"});

        interceptor
            .invoke("search", &args, |_| async {
                Ok(ToolOutcome::ok(json!("r")))
            })
            .await
            .unwrap();

        for _ in 0..3 {
            interceptor
                .invoke("search", &args, |_| async {
                    Ok(ToolOutcome::ok(json!("never")))
                })
                .await
                .unwrap();
        }

        let stats = interceptor.stats();

        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 3);
        assert!((stats.hit_rate() - 0.75).abs() < 1e-9);

        interceptor.reset_stats();
        assert_eq!(interceptor.stats().hits, 0);
    }

    #[tokio::test]
    async fn test_format_context_hints() {
        use crate::domain::tool_cache::CacheEntry;

        let entry = CacheEntry::new(
            "abc",
            "search",
            r#"{"query":"rust"}"#,
            vec![1.0],
            json!({"results": [1]}),
        );
        let hints = vec![CacheHit::new(entry, 0.87, 1.2)];

        let text = ToolInterceptor::format_context_hints(&hints);

        assert!(text.contains("similarity 0.87"));
        assert!(text.contains(r#"{"query":"rust"}"#));
        assert!(text.contains(r#"{"results":[1]}"#));
    }
}
