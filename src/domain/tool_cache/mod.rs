//! Tool cache domain models and traits
//!
//! Core types for the semantic tool-call cache: entries carrying two
//! independent reference counters, the three-way lookup decision, the
//! composite eviction score, and the storage/index traits the decision
//! engine is built against.

mod config;
mod decision;
mod entry;
mod index;
pub mod scoring;
pub mod signature;
mod store;

pub use config::{EvictionPolicy, ToolCacheConfig};
pub use decision::{CacheStats, Decision, InterceptorStats};
pub use entry::{CacheEntry, CacheHit, TouchKind};
pub use index::{IndexMatch, VectorIndex};
pub use store::EntryStore;
