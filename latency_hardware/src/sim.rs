//! Simulated display/camera loopback.
//!
//! `SimScreen` logs every commanded color with a clock timestamp.
//! `SimCamera` samples that log at a fixed frame rate: each frame sees the
//! color commanded `latency` earlier, ramping linearly over `rise` from the
//! previous color, plus seeded uniform noise. Both halves share one
//! `SimRig`, so a session run against them measures the configured latency.
//!
//! Frames only move forward, so once a command is visible to the camera every
//! older one is folded into the panel's base color and dropped. The log holds
//! at most the commands issued within the last `latency`, plus one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use latency_traits::clock::Clock;
use latency_traits::{BoxError, DisplayColor, Sample, Sampler, Screen, Timestamp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Loopback parameters.
#[derive(Debug, Clone)]
pub struct SimParams {
    pub latency: Duration,
    pub rise: Duration,
    pub frame_rate_hz: u32,
    /// Peak amplitude of the uniform noise added to each frame.
    pub noise: f64,
    pub seed: u64,
    /// What the panel shows before the first command.
    pub initial: DisplayColor,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(30),
            rise: Duration::from_millis(4),
            frame_rate_hz: 240,
            noise: 0.02,
            seed: 1,
            initial: DisplayColor::Dark,
        }
    }
}

#[inline]
fn level_of(color: DisplayColor) -> f64 {
    match color {
        DisplayColor::Dark => 0.0,
        DisplayColor::Light => 1.0,
    }
}

#[inline]
fn ns(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}

/// What the simulated panel has been told to show.
#[derive(Debug)]
struct Panel {
    /// Color before the oldest retained command.
    base: DisplayColor,
    commands: VecDeque<(Timestamp, DisplayColor)>,
}

impl Panel {
    fn level_at(&self, visible: Timestamp, rise_ns: i64) -> f64 {
        let Some(idx) = self.commands.iter().rposition(|(at, _)| *at <= visible) else {
            return level_of(self.base);
        };
        let (at, color) = self.commands[idx];
        let from = if idx == 0 {
            level_of(self.base)
        } else {
            level_of(self.commands[idx - 1].1)
        };
        let to = level_of(color);
        if rise_ns <= 0 {
            return to;
        }
        let frac = (visible.nanos_since(at) as f64 / rise_ns as f64).clamp(0.0, 1.0);
        from + (to - from) * frac
    }

    /// Drop commands older than the newest one visible at `visible`.
    fn prune(&mut self, visible: Timestamp) {
        while self.commands.len() >= 2 && self.commands[1].0 <= visible {
            if let Some((_, color)) = self.commands.pop_front() {
                self.base = color;
            }
        }
    }
}

type Shared = Arc<Mutex<Panel>>;

#[inline]
fn lock(panel: &Shared) -> MutexGuard<'_, Panel> {
    panel.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared state of one simulated loopback.
pub struct SimRig<C: Clock + Clone> {
    clock: C,
    params: SimParams,
    panel: Shared,
}

impl<C: Clock + Clone> SimRig<C> {
    /// The panel shows `params.initial` until the first command.
    pub fn new(clock: C, params: SimParams) -> Self {
        let panel = Panel {
            base: params.initial,
            commands: VecDeque::new(),
        };
        Self {
            clock,
            params,
            panel: Arc::new(Mutex::new(panel)),
        }
    }

    pub fn screen(&self) -> SimScreen<C> {
        SimScreen {
            clock: self.clock.clone(),
            panel: self.panel.clone(),
        }
    }

    pub fn camera(&self) -> SimCamera<C> {
        let period_ns = 1_000_000_000 / i64::from(self.params.frame_rate_hz.max(1));
        let first = self.clock.now();
        SimCamera {
            clock: self.clock.clone(),
            panel: self.panel.clone(),
            latency_ns: ns(self.params.latency),
            rise_ns: ns(self.params.rise),
            noise: self.params.noise.abs(),
            rng: StdRng::seed_from_u64(self.params.seed),
            period_ns: period_ns.max(1),
            next_frame: first,
        }
    }
}

/// Screen half: records commanded colors.
pub struct SimScreen<C: Clock> {
    clock: C,
    panel: Shared,
}

impl<C: Clock> SimScreen<C> {
    /// Retained commands, oldest first.
    pub fn commands(&self) -> Vec<(Timestamp, DisplayColor)> {
        lock(&self.panel).commands.iter().copied().collect()
    }
}

impl<C: Clock> Screen for SimScreen<C> {
    fn set_color(&mut self, color: DisplayColor) -> Result<(), BoxError> {
        let now = self.clock.now();
        lock(&self.panel).commands.push_back((now, color));
        tracing::trace!(?color, "sim screen");
        Ok(())
    }
}

/// Camera half: a non-blocking frame source.
pub struct SimCamera<C: Clock> {
    clock: C,
    panel: Shared,
    latency_ns: i64,
    rise_ns: i64,
    noise: f64,
    rng: StdRng,
    period_ns: i64,
    next_frame: Timestamp,
}

impl<C: Clock> SimCamera<C> {
    /// Noise-free level the camera sees at `t`.
    ///
    /// Exact for any `t` at or after the last polled frame; earlier history
    /// may already be pruned.
    pub fn ideal_level(&self, t: Timestamp) -> f64 {
        lock(&self.panel).level_at(t.advance(-self.latency_ns), self.rise_ns)
    }
}

impl<C: Clock> Sampler for SimCamera<C> {
    fn poll(&mut self) -> Result<Option<Sample>, BoxError> {
        if self.clock.now() < self.next_frame {
            return Ok(None);
        }
        let t = self.next_frame;
        self.next_frame = t.advance(self.period_ns);
        let jitter = if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        };
        let ideal = {
            let mut panel = lock(&self.panel);
            let visible = t.advance(-self.latency_ns);
            let level = panel.level_at(visible, self.rise_ns);
            panel.prune(visible);
            level
        };
        let level = (ideal + jitter).clamp(0.0, 1.0);
        Ok(Some(Sample::new(t, level)))
    }
}
