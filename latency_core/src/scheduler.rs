//! Randomized-hold flip scheduler.
//!
//! A detected crossing never flips the screen immediately. The flip is armed
//! for `crossing.time + hold`, with `hold` drawn uniformly from
//! `[hold_min, hold_max]`, and committed by the first `maybe_commit` call at or
//! after that instant. A fixed hold can lock in with the display refresh being
//! measured; drawing it at random keeps the loop from phase-locking.

use std::time::Duration;

use latency_traits::{DisplayColor, Timestamp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detector::Crossing;
use crate::util::duration_ns;

/// Owns the displayed color and the pending flip.
#[derive(Debug)]
pub struct HoldScheduler {
    hold_min_ns: i64,
    hold_max_ns: i64,
    rng: StdRng,
    displayed: DisplayColor,
    pending_flip: Option<Timestamp>,
    next_switch: Timestamp,
    camera_dark: bool,
}

impl HoldScheduler {
    /// Scheduler with an entropy-seeded random source.
    ///
    /// `hold_min` must be non-zero and `hold_min <= hold_max`; the builder validates this.
    pub fn new(hold_min: Duration, hold_max: Duration) -> Self {
        Self::with_rng(hold_min, hold_max, StdRng::from_entropy())
    }

    /// Scheduler with a reproducible random source.
    pub fn seeded(hold_min: Duration, hold_max: Duration, seed: u64) -> Self {
        Self::with_rng(hold_min, hold_max, StdRng::seed_from_u64(seed))
    }

    fn with_rng(hold_min: Duration, hold_max: Duration, rng: StdRng) -> Self {
        debug_assert!(!hold_min.is_zero() && hold_min <= hold_max);
        Self {
            hold_min_ns: duration_ns(hold_min),
            hold_max_ns: duration_ns(hold_max),
            rng,
            displayed: DisplayColor::Light,
            pending_flip: None,
            next_switch: Timestamp::EPOCH,
            camera_dark: false,
        }
    }

    #[inline]
    pub fn displayed(&self) -> DisplayColor {
        self.displayed
    }

    #[inline]
    pub fn pending_flip(&self) -> Option<Timestamp> {
        self.pending_flip
    }

    /// Most recently scheduled switch time (epoch before the first crossing).
    #[inline]
    pub fn next_switch(&self) -> Timestamp {
        self.next_switch
    }

    fn draw_hold_ns(&mut self) -> i64 {
        if self.hold_max_ns <= self.hold_min_ns {
            return self.hold_min_ns;
        }
        self.rng.gen_range(self.hold_min_ns..=self.hold_max_ns)
    }

    /// Register a crossing and arm the next flip.
    ///
    /// Returns the delay of the crossing relative to the previously scheduled
    /// switch time (ms), and the newly scheduled switch time. The delay is
    /// measured against the scheduler's own prior commitment, so it includes
    /// any lag between the commit and the actual screen update as seen by the
    /// camera.
    pub fn on_crossing(&mut self, crossing: &Crossing) -> (f64, Timestamp) {
        let delay_ms = crossing.time.millis_since(self.next_switch);
        let hold_ns = self.draw_hold_ns();
        let next = crossing.time.advance(hold_ns);
        self.next_switch = next;
        self.pending_flip = Some(next);
        self.camera_dark = crossing.now_dark;
        (delay_ms, next)
    }

    /// Commit the pending flip if `now` has reached it.
    ///
    /// The committed color is the opposite of what the camera last saw, which
    /// is what keeps the measurement loop oscillating.
    pub fn maybe_commit(&mut self, now: Timestamp) -> Option<DisplayColor> {
        match self.pending_flip {
            Some(at) if now >= at => {
                let color = if self.camera_dark {
                    DisplayColor::Light
                } else {
                    DisplayColor::Dark
                };
                self.displayed = color;
                self.pending_flip = None;
                Some(color)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crossing(ms: i64, now_dark: bool) -> Crossing {
        Crossing {
            time: Timestamp::from_millis(ms),
            now_dark,
            clamped: false,
        }
    }

    fn sched() -> HoldScheduler {
        HoldScheduler::seeded(Duration::from_millis(40), Duration::from_millis(100), 7)
    }

    #[test]
    fn hold_lies_within_bounds() {
        let mut s = sched();
        for i in 0..200 {
            let c = crossing(i * 1000, i % 2 == 0);
            let (_, next) = s.on_crossing(&c);
            let hold = next.nanos_since(c.time);
            assert!((40_000_000..=100_000_000).contains(&hold), "hold {hold}");
        }
    }

    #[test]
    fn delay_is_relative_to_prior_schedule() {
        let mut s = sched();
        let (_, next) = s.on_crossing(&crossing(1000, true));
        let later = next.advance(12_500_000);
        let (delay, _) = s.on_crossing(&Crossing {
            time: later,
            now_dark: false,
            clamped: false,
        });
        assert!((delay - 12.5).abs() < 1e-9);
    }

    #[test]
    fn commit_waits_for_armed_time() {
        let mut s = sched();
        let (_, next) = s.on_crossing(&crossing(0, true));
        assert_eq!(s.maybe_commit(next.advance(-1)), None);
        assert_eq!(s.pending_flip(), Some(next));
        assert_eq!(s.maybe_commit(next), Some(DisplayColor::Light));
        assert_eq!(s.pending_flip(), None);
        // nothing pending any more
        assert_eq!(s.maybe_commit(next.advance(1_000_000_000)), None);
    }

    #[test]
    fn commit_shows_opposite_of_camera() {
        let mut s = sched();
        let (_, next) = s.on_crossing(&crossing(0, false));
        assert_eq!(s.maybe_commit(next), Some(DisplayColor::Dark));
        assert_eq!(s.displayed(), DisplayColor::Dark);
    }

    #[test]
    fn fixed_hold_when_bounds_equal() {
        let mut s =
            HoldScheduler::seeded(Duration::from_millis(41), Duration::from_millis(41), 1);
        let (_, next) = s.on_crossing(&crossing(0, true));
        assert_eq!(next, Timestamp::from_millis(41));
    }
}
