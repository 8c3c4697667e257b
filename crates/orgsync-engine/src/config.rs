//! Engine configuration.

use std::time::Duration;

/// Tuning knobs for the propagation executor.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum (type, target) applies in flight at once, independent of
    /// plan size. A 500-location plan never opens 500 storage
    /// connections.
    pub max_concurrency: usize,
    /// Attempts per target apply before a transient failure is recorded
    /// as `transient_exhausted` (default: 3).
    pub max_apply_attempts: u32,
    /// Backoff before the second attempt; doubles per subsequent attempt
    /// (default: 50ms).
    pub initial_backoff: Duration,
    /// Overall wall-clock budget for one job. On expiry the job is
    /// cancelled and finalized with whatever results have landed
    /// (default: 300s).
    pub job_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            max_apply_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            job_timeout: Duration::from_secs(300),
        }
    }
}
