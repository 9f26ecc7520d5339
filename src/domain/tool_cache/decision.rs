//! Cache decision and statistics types

use serde::{Deserialize, Serialize};

use super::CacheHit;

/// Outcome of a cache lookup for an incoming tool call.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Best candidate is similar enough to substitute for execution.
    /// The matched entry's reuse counter has already been bumped.
    Reuse(CacheHit),
    /// Candidates are similar enough to surface as hints alongside a
    /// real execution, ordered by similarity descending. Their context
    /// counters have already been bumped.
    ContextAssist(Vec<CacheHit>),
    /// No candidate reached the similarity threshold; the tool must run.
    Miss,
}

impl Decision {
    /// Whether the tool call still has to execute
    pub fn requires_execution(&self) -> bool {
        !matches!(self, Decision::Reuse(_))
    }

    /// Short label for logging
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Reuse(_) => "reuse",
            Decision::ContextAssist(_) => "context_assist",
            Decision::Miss => "miss",
        }
    }
}

/// Aggregate statistics over all cache entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries currently stored
    pub total_entries: usize,
    /// Sum of reuse counters across entries
    pub total_reuse_count: u64,
    /// Sum of context counters across entries
    pub total_context_count: u64,
    /// Sum of both counters
    pub total_references: u64,
    /// Mean references per entry
    pub avg_reference_count: f64,
    /// Highest combined counter on a single entry
    pub max_reference_count: u64,
}

/// Counters kept by the interceptor across intercepted calls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterceptorStats {
    /// Calls served entirely from cache
    pub hits: u64,
    /// Calls that executed the real tool
    pub misses: u64,
    /// Executions that received context hints
    pub context_provided: u64,
}

impl InterceptorStats {
    /// Fraction of intercepted calls served from cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;

        if total == 0 {
            return 0.0;
        }

        self.hits as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_requires_execution() {
        assert!(Decision::Miss.requires_execution());
        assert!(Decision::ContextAssist(vec![]).requires_execution());
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(Decision::Miss.label(), "miss");
        assert_eq!(Decision::ContextAssist(vec![]).label(), "context_assist");
    }

    #[test]
    fn test_hit_rate() {
        let stats = InterceptorStats {
            hits: 8,
            misses: 2,
            context_provided: 1,
        };

        assert!((stats.hit_rate() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_hit_rate_no_calls() {
        assert_eq!(InterceptorStats::default().hit_rate(), 0.0);
    }
}
