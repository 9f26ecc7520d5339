//! In-memory entry store implementation

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::tool_cache::{CacheEntry, EntryStore, EvictionPolicy, TouchKind};
use crate::domain::DomainError;

/// Entry data plus its current eviction score
#[derive(Debug, Clone)]
struct StoredEntry {
    entry: CacheEntry,
    score: f64,
}

/// In-memory entry store backed by a `HashMap`.
///
/// Suitable for development and single-process deployments. For shared
/// or durable state use [`RedisEntryStore`](super::RedisEntryStore).
/// `touch` holds the write lock for the whole read-increment-write, so
/// concurrent hits on the same entry never lose updates.
#[derive(Debug, Default)]
pub struct InMemoryEntryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemoryEntryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lock_err(e: impl std::fmt::Display) -> DomainError {
        DomainError::storage(format!("Failed to acquire read lock: {}", e))
    }

    fn write_lock_err(e: impl std::fmt::Display) -> DomainError {
        DomainError::storage(format!("Failed to acquire write lock: {}", e))
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn get(&self, id: &str) -> Result<Option<CacheEntry>, DomainError> {
        let entries = self.entries.read().map_err(Self::read_lock_err)?;

        Ok(entries.get(id).map(|stored| stored.entry.clone()))
    }

    async fn insert(&self, entry: CacheEntry, score: f64) -> Result<bool, DomainError> {
        let mut entries = self.entries.write().map_err(Self::write_lock_err)?;

        if entries.contains_key(entry.id()) {
            return Ok(false);
        }

        entries.insert(entry.id().to_string(), StoredEntry { entry, score });
        Ok(true)
    }

    async fn touch(&self, id: &str, kind: TouchKind) -> Result<Option<CacheEntry>, DomainError> {
        let mut entries = self.entries.write().map_err(Self::write_lock_err)?;

        match entries.get_mut(id) {
            Some(stored) => {
                stored.entry.apply_touch(kind);
                Ok(Some(stored.entry.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update_score(&self, id: &str, score: f64) -> Result<bool, DomainError> {
        let mut entries = self.entries.write().map_err(Self::write_lock_err)?;

        match entries.get_mut(id) {
            Some(stored) => {
                stored.score = score;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let mut entries = self.entries.write().map_err(Self::write_lock_err)?;

        Ok(entries.remove(id).is_some())
    }

    async fn exists(&self, id: &str) -> Result<bool, DomainError> {
        let entries = self.entries.read().map_err(Self::read_lock_err)?;

        Ok(entries.contains_key(id))
    }

    async fn len(&self) -> Result<usize, DomainError> {
        let entries = self.entries.read().map_err(Self::read_lock_err)?;

        Ok(entries.len())
    }

    async fn evict_candidates(
        &self,
        policy: EvictionPolicy,
        n: usize,
    ) -> Result<Vec<String>, DomainError> {
        let entries = self.entries.read().map_err(Self::read_lock_err)?;

        let mut candidates: Vec<(&String, &StoredEntry)> = entries.iter().collect();

        match policy {
            EvictionPolicy::Score => {
                // Lowest score first, ties broken by oldest creation
                candidates.sort_by(|(_, a), (_, b)| {
                    a.score
                        .partial_cmp(&b.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.entry.created_at().cmp(&b.entry.created_at()))
                });
            }
            EvictionPolicy::Lru => {
                candidates
                    .sort_by_key(|(_, stored)| stored.entry.last_accessed_at());
            }
            EvictionPolicy::Lfu => {
                candidates.sort_by_key(|(_, stored)| {
                    (
                        stored.entry.total_reference_count(),
                        stored.entry.created_at(),
                    )
                });
            }
            EvictionPolicy::Fifo => {
                candidates.sort_by_key(|(_, stored)| stored.entry.created_at());
            }
        }

        Ok(candidates
            .into_iter()
            .take(n)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn ids(&self) -> Result<Vec<String>, DomainError> {
        let entries = self.entries.read().map_err(Self::read_lock_err)?;

        Ok(entries.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut entries = self.entries.write().map_err(Self::write_lock_err)?;

        entries.clear();
        Ok(())
    }
}
