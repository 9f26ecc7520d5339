//! Cache entry and hit types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which counter a cache hit increments on an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchKind {
    /// The entry was served as a direct substitute for execution
    Reuse,
    /// The entry was surfaced as a hint alongside a real execution
    Context,
}

/// A cached tool call.
///
/// The identifying fields (`id`, `tool_name`, `query_text`,
/// `query_vector`, `result`) are immutable once stored; only the
/// counters and `last_accessed_at` change over the entry's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Deterministic identifier derived from tool name and signature
    id: String,
    /// Tool namespace this entry belongs to
    tool_name: String,
    /// Canonical serialized call signature
    query_text: String,
    /// Embedding of the call signature
    query_vector: Vec<f32>,
    /// Opaque result payload returned by the tool
    result: serde_json::Value,
    /// Times this entry was served as a direct substitute for execution
    reuse_count: u64,
    /// Times this entry was surfaced as a context hint
    context_count: u64,
    /// When the entry was first created
    created_at: DateTime<Utc>,
    /// When the entry was last served (reuse or context)
    last_accessed_at: DateTime<Utc>,
    /// Whether the recorded tool call succeeded
    success: bool,
}

impl CacheEntry {
    /// Create a new entry with zeroed counters
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        query_text: impl Into<String>,
        query_vector: Vec<f32>,
        result: serde_json::Value,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            query_text: query_text.into(),
            query_vector,
            result,
            reuse_count: 0,
            context_count: 0,
            created_at: now,
            last_accessed_at: now,
            success: true,
        }
    }

    /// Mark whether the recorded tool call succeeded
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    /// Get the entry ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the tool namespace
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Get the canonical call signature
    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    /// Get the signature embedding
    pub fn query_vector(&self) -> &[f32] {
        &self.query_vector
    }

    /// Get the cached result
    pub fn result(&self) -> &serde_json::Value {
        &self.result
    }

    /// Get the direct reuse count
    pub fn reuse_count(&self) -> u64 {
        self.reuse_count
    }

    /// Get the context hint count
    pub fn context_count(&self) -> u64 {
        self.context_count
    }

    /// Total number of times this entry was referenced
    pub fn total_reference_count(&self) -> u64 {
        self.reuse_count + self.context_count
    }

    /// Get the creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the last access timestamp
    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    /// Whether the recorded tool call succeeded
    pub fn success(&self) -> bool {
        self.success
    }

    /// Bump the counter for `kind` and refresh the access timestamp
    pub fn apply_touch(&mut self, kind: TouchKind) {
        match kind {
            TouchKind::Reuse => self.reuse_count += 1,
            TouchKind::Context => self.context_count += 1,
        }
        self.last_accessed_at = Utc::now();
    }
}

/// A cache candidate with its similarity to the incoming call and the
/// composite score used for ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHit {
    /// The matched entry
    pub entry: CacheEntry,
    /// Similarity between the incoming call and the entry (0-1)
    pub similarity: f32,
    /// Composite score at lookup time
    pub weighted_score: f64,
}

impl CacheHit {
    /// Create a new cache hit
    pub fn new(entry: CacheEntry, similarity: f32, weighted_score: f64) -> Self {
        Self {
            entry,
            similarity,
            weighted_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> CacheEntry {
        CacheEntry::new(
            "abc123",
            "search",
            r#"{"query":"rust"}"#,
            vec![0.1, 0.2],
            json!({"results": []}),
        )
    }

    #[test]
    fn test_new_entry_counters_start_at_zero() {
        let entry = entry();

        assert_eq!(entry.reuse_count(), 0);
        assert_eq!(entry.context_count(), 0);
        assert_eq!(entry.total_reference_count(), 0);
        assert!(entry.success());
    }

    #[test]
    fn test_counters_increment_independently() {
        let mut entry = entry();

        for _ in 0..3 {
            entry.apply_touch(TouchKind::Reuse);
        }
        for _ in 0..2 {
            entry.apply_touch(TouchKind::Context);
        }

        assert_eq!(entry.reuse_count(), 3);
        assert_eq!(entry.context_count(), 2);
        assert_eq!(entry.total_reference_count(), 5);
    }

    #[test]
    fn test_touch_refreshes_access_time() {
        let mut entry = entry();
        let before = entry.last_accessed_at();

        std::thread::sleep(std::time::Duration::from_millis(5));
        entry.apply_touch(TouchKind::Reuse);

        assert!(entry.last_accessed_at() > before);
    }

    #[test]
    fn test_serde_round_trip() {
        let entry = entry().with_success(false);
        let json = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id(), entry.id());
        assert_eq!(back.tool_name(), entry.tool_name());
        assert!(!back.success());
    }
}
