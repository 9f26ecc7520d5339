//! Cache management endpoints

use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::tool_cache::CacheStats;

/// Search request for similar cached calls
#[derive(Debug, Deserialize)]
pub struct CacheSearchRequest {
    pub tool_name: String,
    pub input_args: serde_json::Value,
    /// Optional cap on returned hits, bounded by the configured top-k
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// One hit in a search response
#[derive(Debug, Serialize)]
pub struct CacheHitResponse {
    pub entry_id: String,
    pub tool_name: String,
    pub similarity: f32,
    pub weighted_score: f64,
    pub reference_count: u64,
}

/// Record request for a freshly executed tool call
#[derive(Debug, Deserialize)]
pub struct CacheRecordRequest {
    pub tool_name: String,
    pub input_args: serde_json::Value,
    pub output: serde_json::Value,
    #[serde(default = "default_success")]
    pub success: bool,
}

fn default_success() -> bool {
    true
}

/// Confirmation of a recorded entry
#[derive(Debug, Serialize)]
pub struct CacheRecordResponse {
    pub entry_id: String,
    pub message: String,
}

/// Generic message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/cache/search
pub async fn search_cache(
    State(state): State<AppState>,
    Json(request): Json<CacheSearchRequest>,
) -> Result<Json<Vec<CacheHitResponse>>, ApiError> {
    validate_tool_name(&request.tool_name)?;

    let mut hits = state
        .cache
        .search(&request.tool_name, &request.input_args)
        .await?;

    if let Some(top_k) = request.top_k {
        hits.truncate(top_k);
    }

    let response = hits
        .into_iter()
        .map(|hit| CacheHitResponse {
            entry_id: hit.entry.id().to_string(),
            tool_name: hit.entry.tool_name().to_string(),
            similarity: hit.similarity,
            weighted_score: hit.weighted_score,
            reference_count: hit.entry.total_reference_count(),
        })
        .collect();

    Ok(Json(response))
}

/// POST /api/cache/record
pub async fn record_cache(
    State(state): State<AppState>,
    Json(request): Json<CacheRecordRequest>,
) -> Result<Json<CacheRecordResponse>, ApiError> {
    validate_tool_name(&request.tool_name)?;

    let entry = state
        .cache
        .record(
            &request.tool_name,
            &request.input_args,
            request.output,
            request.success,
        )
        .await?;

    Ok(Json(CacheRecordResponse {
        entry_id: entry.id().to_string(),
        message: "Saved successfully".to_string(),
    }))
}

/// GET /api/cache/stats
pub async fn cache_stats(
    State(state): State<AppState>,
) -> Result<Json<CacheStats>, ApiError> {
    let stats = state.cache.stats().await?;

    Ok(Json(stats))
}

/// DELETE /api/cache
pub async fn clear_cache(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.cache.clear().await?;

    Ok(Json(MessageResponse {
        message: "Cache cleared successfully".to_string(),
    }))
}

fn validate_tool_name(tool_name: &str) -> Result<(), ApiError> {
    if tool_name.trim().is_empty() {
        return Err(ApiError::bad_request("tool_name must not be empty"));
    }

    Ok(())
}
