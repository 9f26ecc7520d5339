//! Tool Recall
//!
//! A semantic cache for LLM agent tool calls. Incoming calls are
//! classified against previously recorded ones: near-identical calls
//! are served straight from cache, similar calls are surfaced as
//! context hints alongside a real execution, and everything else runs
//! normally and is recorded for next time. Entries carry two
//! independent reference counters that drive score-based eviction.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use config::StoreBackend;
use domain::tool_cache::{EntryStore, VectorIndex};
use infrastructure::embedding::{HttpClient, OpenAiEmbeddingProvider};
use infrastructure::index::InMemoryVectorIndex;
use infrastructure::services::ToolCacheService;
use infrastructure::store::{InMemoryEntryStore, RedisEntryStore, RedisStoreConfig};

/// Build the application state from configuration
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn EntryStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(InMemoryEntryStore::new()),
        StoreBackend::Redis => {
            let url = config.store.redis_url.clone().ok_or_else(|| {
                anyhow::anyhow!("store.redis_url is required for the redis backend")
            })?;

            let mut redis_config = RedisStoreConfig::new(url);
            if let Some(prefix) = &config.store.key_prefix {
                redis_config = redis_config.with_key_prefix(prefix);
            }

            Arc::new(RedisEntryStore::new(redis_config).await?)
        }
    };

    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());

    let api_key = config
        .embedding
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .ok_or_else(|| {
            anyhow::anyhow!("embedding API key not configured (embedding.api_key or OPENAI_API_KEY)")
        })?;

    let http = HttpClient::with_timeout(Duration::from_secs(config.embedding.timeout_secs))?;
    let provider = match &config.embedding.base_url {
        Some(base_url) => OpenAiEmbeddingProvider::with_base_url(http, api_key, base_url),
        None => OpenAiEmbeddingProvider::new(http, api_key),
    };

    let mut service =
        ToolCacheService::with_config(store, index, Arc::new(provider), config.cache.clone())?
            .with_adapter_timeout(Duration::from_secs(config.embedding.timeout_secs));

    if let Some(model) = &config.embedding.model {
        service = service.with_embedding_model(model);
    }

    Ok(AppState::new(Arc::new(service)))
}
