//! `From` implementations bridging `latency_config` types to `latency_core` types.

use std::time::Duration;

use crate::config::{EngineCfg, RunParams, Timeouts};
use crate::util::secs_f64_to_duration;

// ── EngineCfg ────────────────────────────────────────────────────────────────

impl From<&latency_config::AnalysisCfg> for EngineCfg {
    fn from(c: &latency_config::AnalysisCfg) -> Self {
        Self {
            threshold: c.threshold,
            capacity: c.capacity,
            warmup: c.warmup,
            hold_min: secs_f64_to_duration(c.hold_min_s),
            hold_max: secs_f64_to_duration(c.hold_max_s),
            seed: c.seed,
        }
    }
}

// ── RunParams ────────────────────────────────────────────────────────────────

impl From<&latency_config::RunnerCfg> for RunParams {
    fn from(c: &latency_config::RunnerCfg) -> Self {
        Self {
            // 0 means unbounded
            max_run: (c.max_run_ms > 0).then(|| Duration::from_millis(c.max_run_ms)),
            idle_sleep: Duration::from_micros(c.idle_sleep_us),
            stall_warn: (c.stall_warn_ms > 0).then(|| Duration::from_millis(c.stall_warn_ms)),
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&latency_config::SensorCfg> for Timeouts {
    fn from(c: &latency_config::SensorCfg) -> Self {
        Self {
            sensor_ms: c.read_timeout_ms,
        }
    }
}
