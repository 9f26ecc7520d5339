//! Vector index trait

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A nearest-neighbor match returned by the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    /// Entry id of the match
    pub id: String,
    /// Similarity to the query vector (0-1, higher is closer)
    pub similarity: f32,
}

impl IndexMatch {
    /// Create a new match
    pub fn new(id: impl Into<String>, similarity: f32) -> Self {
        Self {
            id: id.into(),
            similarity,
        }
    }
}

/// Narrow interface over an external vector search provider.
///
/// Namespaces map to tool names so that similarity search never
/// crosses tools. Implementations range from an in-memory brute-force
/// cosine scan to a networked index; they are selected at construction
/// and swapped behind dynamic dispatch.
#[async_trait]
pub trait VectorIndex: Send + Sync + Debug {
    /// Insert or replace the vector for an entry
    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        vector: Vec<f32>,
    ) -> Result<(), DomainError>;

    /// Return up to `top_k` matches ranked by similarity descending
    async fn search(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexMatch>, DomainError>;

    /// Remove an entry's vector. Returns `false` if it was absent.
    async fn delete(&self, namespace: &str, id: &str) -> Result<bool, DomainError>;

    /// Remove every vector in every namespace
    async fn clear(&self) -> Result<(), DomainError>;
}
