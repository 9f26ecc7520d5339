//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::services::ToolCacheService;

/// Application state shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ToolCacheService>,
}

impl AppState {
    /// Create state over a cache service
    pub fn new(cache: Arc<ToolCacheService>) -> Self {
        Self { cache }
    }
}
