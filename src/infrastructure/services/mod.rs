//! Application services

mod interceptor;
mod tool_cache_service;

pub use interceptor::{ToolInterceptor, ToolOutcome};
pub use tool_cache_service::ToolCacheService;
