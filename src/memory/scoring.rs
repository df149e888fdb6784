//! Hybrid relevance scoring.
//!
//! Combines vector distance, temporal recency, caller-assigned importance,
//! and retrieval-history "stickiness" into one float. Records recalled often
//! age slower: stickiness divides the record's effective age before the
//! half-life decay is applied.

use serde::{Deserialize, Serialize};

use crate::memory::types::Metadata;

/// Knobs for the composite score. The defaults weight similarity 70/30 over
/// recency with a 30-day half-life and no recency floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Days for recency to halve (before stickiness stretching).
    pub decay_half_life_days: f32,
    /// Blend factor: 0.0 = pure similarity, 1.0 = pure recency.
    pub time_weight: f32,
    /// Floor applied to the recency term after decay.
    pub min_weight: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            decay_half_life_days: 30.0,
            time_weight: 0.3,
            min_weight: 0.0,
        }
    }
}

/// L2 distance to similarity in (0, 1].
pub fn similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// Salience multiplier: 1.0 for never-recalled records, growing
/// logarithmically (recall 10 -> ~3.4, recall 100 -> ~5.6).
pub fn stickiness(recall_count: u32) -> f32 {
    1.0 + (1.0 + recall_count as f32).ln()
}

/// Composite score for one search hit.
pub fn composite_score(
    distance: f32,
    meta: &Metadata,
    config: &ScoringConfig,
    now_ts: i64,
) -> f32 {
    let sim = similarity(distance);

    let age_seconds = (now_ts - meta.timestamp).max(0) as f64;
    let age_days = age_seconds / 86_400.0;
    let effective_age_days = age_days as f32 / stickiness(meta.recall_count);

    let mut recency = 0.5_f32.powf(effective_age_days / config.decay_half_life_days);
    if recency < config.min_weight {
        recency = config.min_weight;
    }

    ((1.0 - config.time_weight) * sim + config.time_weight * recency) * meta.importance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::ContextType;

    const NOW: i64 = 1_700_000_000;

    fn meta_at(timestamp: i64) -> Metadata {
        Metadata::new("x", ContextType::Fact, timestamp)
    }

    #[test]
    fn similarity_maps_distance() {
        assert_eq!(similarity(0.0), 1.0);
        assert!((similarity(1.0) - 0.5).abs() < 1e-6);
        assert!(similarity(9.0) < similarity(1.0));
    }

    #[test]
    fn fresh_exact_hit_scores_importance() {
        // age 0 -> recency 1, sim 1 -> score collapses to importance
        let mut m = meta_at(NOW);
        m.importance = 1.0;
        let s = composite_score(0.0, &m, &ScoringConfig::default(), NOW);
        assert!((s - 1.0).abs() < 1e-6);

        m.importance = 2.5;
        let s = composite_score(0.0, &m, &ScoringConfig::default(), NOW);
        assert!((s - 2.5).abs() < 1e-5);
    }

    #[test]
    fn older_records_score_lower() {
        let cfg = ScoringConfig::default();
        let fresh = composite_score(0.5, &meta_at(NOW), &cfg, NOW);
        let month_old = composite_score(0.5, &meta_at(NOW - 30 * 86_400), &cfg, NOW);
        let year_old = composite_score(0.5, &meta_at(NOW - 365 * 86_400), &cfg, NOW);
        assert!(fresh > month_old);
        assert!(month_old > year_old);
    }

    #[test]
    fn future_timestamps_clamp_to_zero_age() {
        let cfg = ScoringConfig::default();
        let future = composite_score(0.5, &meta_at(NOW + 86_400), &cfg, NOW);
        let now = composite_score(0.5, &meta_at(NOW), &cfg, NOW);
        assert!((future - now).abs() < 1e-6);
    }

    #[test]
    fn recall_slows_decay() {
        let cfg = ScoringConfig::default();
        let mut cold = meta_at(NOW - 90 * 86_400);
        let mut hot = cold.clone();
        cold.recall_count = 0;
        hot.recall_count = 50;
        assert!(
            composite_score(0.5, &hot, &cfg, NOW) > composite_score(0.5, &cold, &cfg, NOW)
        );
    }

    #[test]
    fn min_weight_floors_recency() {
        let cfg = ScoringConfig {
            min_weight: 0.4,
            ..ScoringConfig::default()
        };
        // Ancient record: recency would be ~0 without the floor.
        let m = meta_at(0);
        let s = composite_score(0.0, &m, &cfg, NOW);
        let expected = (1.0 - cfg.time_weight) * 1.0 + cfg.time_weight * 0.4;
        assert!((s - expected).abs() < 1e-4);
    }

    #[test]
    fn stickiness_growth() {
        assert_eq!(stickiness(0), 1.0);
        assert!((stickiness(10) - 3.398).abs() < 0.01);
        assert!(stickiness(100) > stickiness(10));
    }
}
