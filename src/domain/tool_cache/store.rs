//! Entry store trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::{CacheEntry, EvictionPolicy, TouchKind};
use crate::domain::DomainError;

/// Durable or in-memory mapping from entry id to entry data plus its
/// current eviction score.
///
/// The contract is backend-independent: `touch` must be atomic per
/// entry (a single logical read-increment-write) so concurrent hits on
/// the same entry never lose updates. `insert` never overwrites; a new
/// call with new parameters always creates a new entry.
#[async_trait]
pub trait EntryStore: Send + Sync + Debug {
    /// Fetch an entry by id
    async fn get(&self, id: &str) -> Result<Option<CacheEntry>, DomainError>;

    /// Insert a new entry with its initial score. Returns `false` if
    /// the id already existed, in which case the stored entry is kept
    /// untouched.
    async fn insert(&self, entry: CacheEntry, score: f64) -> Result<bool, DomainError>;

    /// Atomically bump the counter for `kind` and refresh the access
    /// timestamp. Returns the updated entry, or `None` if it does not
    /// exist.
    async fn touch(&self, id: &str, kind: TouchKind) -> Result<Option<CacheEntry>, DomainError>;

    /// Replace the stored eviction score. Returns `false` if the entry
    /// does not exist.
    async fn update_score(&self, id: &str, score: f64) -> Result<bool, DomainError>;

    /// Delete an entry. Returns `false` if it was already gone, which
    /// callers treat as success (concurrent evictions race benignly).
    async fn delete(&self, id: &str) -> Result<bool, DomainError>;

    /// Whether an entry exists
    async fn exists(&self, id: &str) -> Result<bool, DomainError>;

    /// Total number of entries across all tool namespaces
    async fn len(&self) -> Result<usize, DomainError>;

    /// Ids of the `n` entries that the given policy would evict first.
    /// For the score policy this is ascending score with ties broken
    /// by oldest creation time.
    async fn evict_candidates(
        &self,
        policy: EvictionPolicy,
        n: usize,
    ) -> Result<Vec<String>, DomainError>;

    /// All entry ids (stats and debugging)
    async fn ids(&self) -> Result<Vec<String>, DomainError>;

    /// Remove every entry
    async fn clear(&self) -> Result<(), DomainError>;
}
