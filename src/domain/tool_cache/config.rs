//! Tool cache configuration

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Eviction strategy for the entry store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Composite score combining reference counts and recency
    #[default]
    Score,
    /// Least recently accessed
    Lru,
    /// Lowest total reference count
    Lfu,
    /// Oldest by creation time
    Fifo,
}

/// Configuration for the tool cache, immutable after construction.
///
/// Thresholds partition the similarity range into three buckets:
/// `[reuse_threshold, 1.0]` serves the cached result directly,
/// `[similarity_threshold, reuse_threshold)` surfaces cached results
/// as context hints, anything below is a miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCacheConfig {
    /// Minimum similarity for a candidate to count as a context hint (0-1)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Minimum similarity for direct reuse (0-1), must be >= similarity_threshold
    #[serde(default = "default_reuse_threshold")]
    pub reuse_threshold: f32,

    /// Maximum number of entries across all tool namespaces
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// Eviction strategy when the cache is over capacity
    #[serde(default)]
    pub eviction_policy: EvictionPolicy,

    /// Balance between reuse and context counts in the score (0-1).
    /// Values above 0.5 weight direct reuse more heavily.
    #[serde(default = "default_reuse_context_factor")]
    pub reuse_context_factor: f64,

    /// Exponential decay rate for recency, per hour since last access
    #[serde(default = "default_time_decay_lambda")]
    pub time_decay_lambda: f64,

    /// Number of nearest neighbors retrieved per lookup
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_similarity_threshold() -> f32 {
    0.75
}

fn default_reuse_threshold() -> f32 {
    0.95
}

fn default_max_cache_size() -> usize {
    1000
}

fn default_reuse_context_factor() -> f64 {
    0.6
}

fn default_time_decay_lambda() -> f64 {
    0.01
}

fn default_top_k() -> usize {
    5
}

impl Default for ToolCacheConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            reuse_threshold: default_reuse_threshold(),
            max_cache_size: default_max_cache_size(),
            eviction_policy: EvictionPolicy::default(),
            reuse_context_factor: default_reuse_context_factor(),
            time_decay_lambda: default_time_decay_lambda(),
            top_k: default_top_k(),
        }
    }
}

impl ToolCacheConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the similarity threshold
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the reuse threshold
    pub fn with_reuse_threshold(mut self, threshold: f32) -> Self {
        self.reuse_threshold = threshold;
        self
    }

    /// Set the maximum cache size
    pub fn with_max_cache_size(mut self, max: usize) -> Self {
        self.max_cache_size = max;
        self
    }

    /// Set the eviction policy
    pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }

    /// Set the reuse/context balance factor
    pub fn with_reuse_context_factor(mut self, factor: f64) -> Self {
        self.reuse_context_factor = factor;
        self
    }

    /// Set the time decay rate
    pub fn with_time_decay_lambda(mut self, lambda: f64) -> Self {
        self.time_decay_lambda = lambda;
        self
    }

    /// Set the number of candidates retrieved per lookup
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Validate threshold ordering and bounds. Invalid values fail
    /// construction of the cache service instead of degrading silently.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(DomainError::validation(format!(
                "similarity_threshold must be in [0, 1], got {}",
                self.similarity_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.reuse_threshold) {
            return Err(DomainError::validation(format!(
                "reuse_threshold must be in [0, 1], got {}",
                self.reuse_threshold
            )));
        }

        if self.reuse_threshold < self.similarity_threshold {
            return Err(DomainError::validation(format!(
                "reuse_threshold ({}) must be >= similarity_threshold ({})",
                self.reuse_threshold, self.similarity_threshold
            )));
        }

        if self.max_cache_size == 0 {
            return Err(DomainError::validation(
                "max_cache_size must be at least 1",
            ));
        }

        if !(0.0..=1.0).contains(&self.reuse_context_factor) {
            return Err(DomainError::validation(format!(
                "reuse_context_factor must be in [0, 1], got {}",
                self.reuse_context_factor
            )));
        }

        if self.time_decay_lambda < 0.0 {
            return Err(DomainError::validation(format!(
                "time_decay_lambda must be >= 0, got {}",
                self.time_decay_lambda
            )));
        }

        if self.top_k == 0 {
            return Err(DomainError::validation("top_k must be at least 1"));
        }

        Ok(())
    }
}
