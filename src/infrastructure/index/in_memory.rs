//! In-memory vector index using linear search

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::embedding::cosine_similarity;
use crate::domain::tool_cache::{IndexMatch, VectorIndex};
use crate::domain::DomainError;

/// Brute-force cosine index with one vector map per tool namespace.
///
/// Search cost is linear in namespace size, which is fine for caches
/// bounded by `max_cache_size`. Production deployments can swap in a
/// networked index behind the same trait.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    namespaces: RwLock<HashMap<String, HashMap<String, Vec<f32>>>>,
}

impl InMemoryVectorIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lock_err(e: impl std::fmt::Display) -> DomainError {
        DomainError::cache(format!("Failed to acquire read lock: {}", e))
    }

    fn write_lock_err(e: impl std::fmt::Display) -> DomainError {
        DomainError::cache(format!("Failed to acquire write lock: {}", e))
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        vector: Vec<f32>,
    ) -> Result<(), DomainError> {
        let mut namespaces = self.namespaces.write().map_err(Self::write_lock_err)?;

        namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(id.to_string(), vector);

        Ok(())
    }

    async fn search(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexMatch>, DomainError> {
        let namespaces = self.namespaces.read().map_err(Self::read_lock_err)?;

        let Some(vectors) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<IndexMatch> = vectors
            .iter()
            .map(|(id, stored)| IndexMatch::new(id, cosine_similarity(vector, stored)))
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn delete(&self, namespace: &str, id: &str) -> Result<bool, DomainError> {
        let mut namespaces = self.namespaces.write().map_err(Self::write_lock_err)?;

        Ok(namespaces
            .get_mut(namespace)
            .is_some_and(|vectors| vectors.remove(id).is_some()))
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut namespaces = self.namespaces.write().map_err(Self::write_lock_err)?;

        namespaces.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_search() {
        let index = InMemoryVectorIndex::new();

        index
            .upsert("search", "a", vec![1.0, 0.0, 0.0])
            .await
            .unwrap();

        let matches = index.search("search", &[1.0, 0.0, 0.0], 5).await.unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "a");
        assert!((matches[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let index = InMemoryVectorIndex::new();

        index
            .upsert("search", "far", vec![0.0, 1.0, 0.0])
            .await
            .unwrap();
        index
            .upsert("search", "near", vec![0.99, 0.1, 0.0])
            .await
            .unwrap();
        index
            .upsert("search", "mid", vec![0.7, 0.7, 0.0])
            .await
            .unwrap();

        let matches = index.search("search", &[1.0, 0.0, 0.0], 3).await.unwrap();

        assert_eq!(matches[0].id, "near");
        assert!(matches[0].similarity >= matches[1].similarity);
        assert!(matches[1].similarity >= matches[2].similarity);
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let index = InMemoryVectorIndex::new();

        for i in 0..10 {
            index
                .upsert("search", &format!("entry-{}", i), vec![1.0, i as f32 * 0.01])
                .await
                .unwrap();
        }

        let matches = index.search("search", &[1.0, 0.0], 3).await.unwrap();

        assert_eq!(matches.len(), 3);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let index = InMemoryVectorIndex::new();

        index.upsert("search", "a", vec![1.0, 0.0]).await.unwrap();
        index.upsert("fetch", "b", vec![1.0, 0.0]).await.unwrap();

        let matches = index.search("search", &[1.0, 0.0], 5).await.unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "a");
    }

    #[tokio::test]
    async fn test_search_empty_namespace() {
        let index = InMemoryVectorIndex::new();

        let matches = index.search("unknown", &[1.0, 0.0], 5).await.unwrap();

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let index = InMemoryVectorIndex::new();
        index.upsert("search", "a", vec![1.0, 0.0]).await.unwrap();

        assert!(index.delete("search", "a").await.unwrap());
        assert!(!index.delete("search", "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_replaces_vector() {
        let index = InMemoryVectorIndex::new();

        index.upsert("search", "a", vec![1.0, 0.0]).await.unwrap();
        index.upsert("search", "a", vec![0.0, 1.0]).await.unwrap();

        let matches = index.search("search", &[0.0, 1.0], 1).await.unwrap();

        assert!((matches[0].similarity - 1.0).abs() < 1e-6);
    }
}
