//! Composite scoring for ranking and eviction
//!
//! The score combines the similarity of a match with how often the
//! entry has paid off (direct reuse weighted above context provision)
//! and how recently it was last accessed:
//!
//! ```text
//! score = similarity + normalized_ref * recency_factor
//!
//! weighted_count = factor * reuse_count + (1 - factor) * context_count
//! normalized_ref = min(1, ln(weighted_count + 1) / ln(100))
//! recency_factor = exp(-lambda * hours_since_last_access)
//! ```
//!
//! The score is monotonically increasing in both counters and
//! monotonically decreasing in the recency gap. Exact weights are
//! policy knobs carried in [`ToolCacheConfig`].

use chrono::{DateTime, Utc};

use super::ToolCacheConfig;

/// Reference count where the logarithmic normalization saturates at 1.0
const REF_SATURATION: f64 = 100.0;

/// Compute the composite score for a candidate at lookup time.
pub fn weighted_score(
    similarity: f32,
    reuse_count: u64,
    context_count: u64,
    last_accessed_at: DateTime<Utc>,
    config: &ToolCacheConfig,
) -> f64 {
    let normalized_ref =
        normalize_reference_count(reuse_count, context_count, config.reuse_context_factor);
    let recency = recency_factor(last_accessed_at, config.time_decay_lambda);

    similarity as f64 + normalized_ref * recency
}

/// Normalize reference counts to [0, 1] with diminishing returns.
pub fn normalize_reference_count(
    reuse_count: u64,
    context_count: u64,
    reuse_context_factor: f64,
) -> f64 {
    let weighted_count = reuse_context_factor * reuse_count as f64
        + (1.0 - reuse_context_factor) * context_count as f64;

    ((weighted_count + 1.0).ln() / REF_SATURATION.ln()).min(1.0)
}

/// Exponential decay in (0, 1] based on hours since last access.
pub fn recency_factor(last_accessed_at: DateTime<Utc>, time_decay_lambda: f64) -> f64 {
    let delta_hours = (Utc::now() - last_accessed_at).num_seconds() as f64 / 3600.0;

    (-time_decay_lambda * delta_hours.max(0.0)).exp()
}
