//! Builder for `LatencyEngine`.
//!
//! `validate_and_build` is the single place where engine configuration is
//! checked and turned into initial analysis state.

use std::sync::Arc;
use std::time::Duration;

use latency_traits::clock::{Clock, MonotonicClock};
use latency_traits::{Sample, Timestamp};

use crate::config::EngineCfg;
use crate::engine::{Counters, LatencyEngine, SENTINEL_LEVEL};
use crate::error::{BuildError, Result};
use crate::scheduler::HoldScheduler;
use crate::stats::DelayRing;

/// Builder for `LatencyEngine`. All fields are validated on `build()`.
#[derive(Default)]
pub struct EngineBuilder {
    cfg: Option<EngineCfg>,
    threshold: Option<f64>,
    capacity: Option<usize>,
    warmup: Option<usize>,
    hold: Option<(Duration, Duration)>,
    seed: Option<u64>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl LatencyEngine {
    /// Start building an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

impl EngineBuilder {
    /// Base configuration; individual setters below override its fields.
    pub fn with_config(mut self, cfg: EngineCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_warmup(mut self, warmup: usize) -> Self {
        self.warmup = Some(warmup);
        self
    }

    pub fn with_hold(mut self, min: Duration, max: Duration) -> Self {
        self.hold = Some((min, max));
        self
    }

    /// Fix the random source for reproducible hold times.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Inject a clock (session start time). Defaults to `MonotonicClock`.
    pub fn with_clock<C: Clock + Send + Sync + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn build(self) -> Result<LatencyEngine> {
        let mut cfg = self.cfg.unwrap_or_default();
        if let Some(t) = self.threshold {
            cfg.threshold = t;
        }
        if let Some(c) = self.capacity {
            cfg.capacity = c;
        }
        if let Some(w) = self.warmup {
            cfg.warmup = w;
        }
        if let Some((min, max)) = self.hold {
            cfg.hold_min = min;
            cfg.hold_max = max;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        validate_and_build(cfg, clock)
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate_and_build(cfg: EngineCfg, clock: Arc<dyn Clock + Send + Sync>) -> Result<LatencyEngine> {
    // ── Validation ───────────────────────────────────────────────────────────
    if !cfg.threshold.is_finite() || !(0.0..=1.0).contains(&cfg.threshold) {
        return Err(invalid("threshold must be in [0.0, 1.0]"));
    }
    if cfg.hold_min.is_zero() {
        return Err(invalid("hold_min must be > 0"));
    }
    if cfg.hold_max < cfg.hold_min {
        return Err(invalid("hold_max must be >= hold_min"));
    }
    let ring = DelayRing::with_warmup(cfg.capacity, cfg.warmup)
        .ok_or_else(|| invalid("capacity must be >= 1"))?;

    // ── Initial state ────────────────────────────────────────────────────────
    let scheduler = match cfg.seed {
        Some(seed) => HoldScheduler::seeded(cfg.hold_min, cfg.hold_max, seed),
        None => HoldScheduler::new(cfg.hold_min, cfg.hold_max),
    };
    let session_start = clock.now();
    tracing::info!(
        threshold = cfg.threshold,
        capacity = cfg.capacity,
        hold_min_ms = cfg.hold_min.as_secs_f64() * 1e3,
        hold_max_ms = cfg.hold_max.as_secs_f64() * 1e3,
        "latency engine ready"
    );

    Ok(LatencyEngine {
        cfg,
        clock,
        session_start,
        previous: Sample::new(Timestamp::EPOCH, SENTINEL_LEVEL),
        scheduler,
        ring,
        counters: Counters::default(),
    })
}
