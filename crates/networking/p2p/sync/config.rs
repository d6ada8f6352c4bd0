use std::time::Duration;

/// Tunables for a sync round. `Default` matches the literals a production deployment uses;
/// tests override individual fields to exercise edge cases without touching the algorithm.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub recently_saved_capacity: usize,
    pub batch_size: usize,
    pub emptish_threshold: f64,
    pub bad_quality_min_responses: usize,
    pub bad_quality_ratio: f64,
    pub reset_root_hint_threshold: u32,
    pub priority_review_period: Duration,
    pub response_timeout_grace: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            recently_saved_capacity: 1_048_576,
            batch_size: 384,
            emptish_threshold: (384.0 / 1024.0) * 0.75,
            bad_quality_min_responses: 64,
            bad_quality_ratio: 0.5,
            reset_root_hint_threshold: 32,
            priority_review_period: Duration::from_secs(60),
            response_timeout_grace: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_emptish_threshold_matches_spec_literal() {
        let cfg = SyncConfig::default();
        assert!((cfg.emptish_threshold - 0.281_25).abs() < 1e-9);
    }
}
