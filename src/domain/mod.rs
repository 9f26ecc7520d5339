//! Domain layer - Core business logic and entities

pub mod embedding;
pub mod error;
pub mod tool_cache;

pub use error::DomainError;
pub use tool_cache::{
    CacheEntry, CacheHit, CacheStats, Decision, EntryStore, EvictionPolicy, IndexMatch,
    InterceptorStats, ToolCacheConfig, TouchKind, VectorIndex,
};
