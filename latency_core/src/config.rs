//! Runtime configuration types for the analysis engine.
//!
//! These are the structs consumed by `LatencyEngine` and the runner.
//! They are separate from the TOML-deserialized config in `latency_config`.

use std::time::Duration;

use crate::stats::{DEFAULT_CAPACITY, DEFAULT_WARMUP};

/// Analysis parameters.
#[derive(Debug, Clone)]
pub struct EngineCfg {
    /// Brightness at or below which a sample counts as dark. Range: [0.0, 1.0].
    pub threshold: f64,
    /// Number of delays kept for rolling statistics.
    pub capacity: usize,
    /// Leading delays excluded from statistics.
    pub warmup: usize,
    /// Shortest hold between a crossing and the flip it arms. Must be > 0.
    pub hold_min: Duration,
    /// Longest hold; the actual hold is drawn uniformly from `[hold_min, hold_max]`.
    pub hold_max: Duration,
    /// Fixed seed for the hold draw; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            capacity: DEFAULT_CAPACITY,
            warmup: DEFAULT_WARMUP,
            hold_min: Duration::from_millis(40),
            hold_max: Duration::from_millis(100),
            seed: None,
        }
    }
}

/// Session loop limits.
#[derive(Debug, Clone)]
pub struct RunParams {
    /// Stop after this long; `None` runs until the stop flag is raised.
    pub max_run: Option<Duration>,
    /// Pause after an empty cycle to avoid a busy spin.
    pub idle_sleep: Duration,
    /// Warn once when the sampler has delivered nothing for this long.
    pub stall_warn: Option<Duration>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            max_run: None,
            idle_sleep: Duration::from_micros(500),
            stall_warn: Some(Duration::from_secs(1)),
        }
    }
}

/// Timeouts at the sampler boundary.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Max probe wait per read (ms).
    pub sensor_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { sensor_ms: 5 }
    }
}
