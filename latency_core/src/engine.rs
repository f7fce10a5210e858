//! The measurement engine: one `update` per sensor cycle.
//!
//! Per cycle:
//! 1. no sample: only the commit check runs (at the previous sample's time)
//! 2. detect a crossing against the previous sample
//! 3. on a crossing: arm the next flip, record the delay, snapshot statistics
//! 4. commit the pending flip if its time has come
//! 5. emit a record for the sample
//! 6. remember the sample for the next interpolation

use std::sync::Arc;

use latency_traits::clock::Clock;
use latency_traits::{DisplayColor, Sample, Timestamp};

use crate::config::EngineCfg;
use crate::detector::{self, Crossing};
use crate::record::{SampleRecord, transition_code};
use crate::scheduler::HoldScheduler;
use crate::session::SessionSummary;
use crate::stats::{DelayRing, Stats};

/// Initial "previous" level: light, at the epoch.
pub const SENTINEL_LEVEL: f64 = 1.0;

/// A crossing and the statistics right after its delay was recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossingReport {
    pub crossing: Crossing,
    /// Delay against the previously scheduled switch time (ms).
    pub delay_ms: f64,
    /// Time the next flip is armed for.
    pub next_switch: Timestamp,
    pub stats: Stats,
}

/// Outcome of one update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cycle {
    /// Record for the processed sample; `None` on an empty or rejected cycle.
    pub record: Option<SampleRecord>,
    pub crossing: Option<CrossingReport>,
    /// Color to render, present only when it differs from what is displayed.
    pub new_color: Option<DisplayColor>,
}

impl Cycle {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.record.is_none()
    }
}

/// Session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub samples: u64,
    pub empty_cycles: u64,
    pub crossings: u64,
    /// Commits, including ones that re-affirmed the current color.
    pub commits: u64,
    /// Commits that changed the displayed color.
    pub flips: u64,
    /// Samples dropped because their timestamp went backwards.
    pub rejected: u64,
    /// Crossings whose interpolation fraction had to be clamped.
    pub clamped: u64,
}

/// Analysis state for one measurement session.
pub struct LatencyEngine {
    pub(crate) cfg: EngineCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) session_start: Timestamp,
    pub(crate) previous: Sample,
    pub(crate) scheduler: HoldScheduler,
    pub(crate) ring: DelayRing,
    pub(crate) counters: Counters,
}

impl core::fmt::Debug for LatencyEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LatencyEngine")
            .field("threshold", &self.cfg.threshold)
            .field("displayed", &self.scheduler.displayed())
            .field("pending_flip", &self.scheduler.pending_flip())
            .field("counters", &self.counters)
            .finish()
    }
}

impl LatencyEngine {
    #[inline]
    pub fn threshold(&self) -> f64 {
        self.cfg.threshold
    }

    #[inline]
    pub fn config(&self) -> &EngineCfg {
        &self.cfg
    }

    #[inline]
    pub fn displayed_color(&self) -> DisplayColor {
        self.scheduler.displayed()
    }

    #[inline]
    pub fn pending_flip(&self) -> Option<Timestamp> {
        self.scheduler.pending_flip()
    }

    #[inline]
    pub fn previous_sample(&self) -> Sample {
        self.previous
    }

    #[inline]
    pub fn session_start(&self) -> Timestamp {
        self.session_start
    }

    #[inline]
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Statistics over the current delay window.
    pub fn stats(&self) -> Stats {
        self.ring.snapshot()
    }

    /// Seconds between session start and `now` per the engine's clock.
    pub fn elapsed_s(&self) -> f64 {
        self.clock.now().secs_since(self.session_start)
    }

    /// Process one sampler poll result.
    pub fn update(&mut self, sample: Option<Sample>) -> Cycle {
        let Some(curr) = sample else {
            self.counters.empty_cycles += 1;
            // No time has been observed to pass, so this can only re-check a due flip.
            let now = self.previous.timestamp;
            let new_color = self.commit(now).and_then(|(_, changed)| changed);
            return Cycle {
                record: None,
                crossing: None,
                new_color,
            };
        };

        if curr.timestamp < self.previous.timestamp {
            self.counters.rejected += 1;
            tracing::warn!(
                regress_ns = self.previous.timestamp.nanos_since(curr.timestamp),
                "sample timestamp went backwards; dropped"
            );
            return Cycle::default();
        }
        self.counters.samples += 1;

        let crossing = detector::detect(self.previous, curr, self.cfg.threshold)
            .map(|c| self.on_crossing(c));

        let committed = self.commit(curr.timestamp);
        let record = SampleRecord {
            elapsed_s: curr.timestamp.secs_since(self.session_start),
            level: curr.level,
            code: transition_code(committed.map(|(color, _)| color)),
        };
        tracing::trace!(level = curr.level, code = record.code, "sample");

        self.previous = curr;
        Cycle {
            record: Some(record),
            crossing,
            new_color: committed.and_then(|(_, changed)| changed),
        }
    }

    fn on_crossing(&mut self, crossing: Crossing) -> CrossingReport {
        self.counters.crossings += 1;
        if crossing.clamped {
            self.counters.clamped += 1;
            tracing::debug!("interpolation fraction clamped; non-monotonic level between samples");
        }
        let (delay_ms, next_switch) = self.scheduler.on_crossing(&crossing);
        let signed = if crossing.now_dark { delay_ms } else { -delay_ms };
        self.ring.record(signed);
        let stats = self.ring.snapshot();
        tracing::debug!(
            now_dark = crossing.now_dark,
            delay_ms,
            hold_ms = next_switch.millis_since(crossing.time),
            "crossing"
        );
        CrossingReport {
            crossing,
            delay_ms,
            next_switch,
            stats,
        }
    }

    /// Run the commit check. Returns the committed color and, when it changed
    /// the displayed color, that color again.
    fn commit(&mut self, now: Timestamp) -> Option<(DisplayColor, Option<DisplayColor>)> {
        let before = self.scheduler.displayed();
        let color = self.scheduler.maybe_commit(now)?;
        self.counters.commits += 1;
        let changed = (color != before).then_some(color);
        if changed.is_some() {
            self.counters.flips += 1;
        }
        Some((color, changed))
    }

    /// End the session and return its summary.
    pub fn finish(self) -> SessionSummary {
        let duration_s = self.previous.timestamp.secs_since(self.session_start).max(0.0);
        let summary = SessionSummary {
            counters: self.counters,
            stats: self.ring.snapshot(),
            delays_recorded: self.ring.frame_count(),
            final_color: self.scheduler.displayed(),
            duration_s,
        };
        tracing::info!(
            samples = summary.counters.samples,
            crossings = summary.counters.crossings,
            flips = summary.counters.flips,
            "session finished"
        );
        summary
    }
}
