//! HTTP router assembly

use axum::routing::{delete, get, post};
use axum::Router;

use super::state::AppState;
use super::{cache, health};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Cache management API
        .route("/api/cache/search", post(cache::search_cache))
        .route("/api/cache/record", post(cache::record_cache))
        .route("/api/cache/stats", get(cache::cache_stats))
        .route("/api/cache", delete(cache::clear_cache))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::tool_cache::ToolCacheConfig;
    use crate::infrastructure::index::InMemoryVectorIndex;
    use crate::infrastructure::services::ToolCacheService;
    use crate::infrastructure::store::InMemoryEntryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let cache = ToolCacheService::with_config(
            Arc::new(InMemoryEntryStore::new()),
            Arc::new(InMemoryVectorIndex::new()),
            Arc::new(MockEmbeddingProvider::new("mock", 64)),
            ToolCacheConfig::default(),
        )
        .unwrap();

        create_router(AppState::new(Arc::new(cache)))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_record_endpoint() {
        let body = serde_json::json!({
            "tool_name": "search",
            "input_args": {"query": "rust"},
            "output": {"results": []}
        });

        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/cache/record")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_json_returns_api_error() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/cache/search")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_clear_endpoint() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/cache")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
