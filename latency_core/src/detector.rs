//! Light/dark threshold crossing detection with sub-sample timing.
//!
//! Two consecutive samples are classified as dark (`level <= threshold`) or
//! light. When the classification differs, the crossing instant is found by
//! linear interpolation between the two samples:
//!
//! ```text
//! t    = (threshold - prev.level) / (curr.level - prev.level)
//! time = prev.timestamp + round(t * (curr.timestamp - prev.timestamp))
//! ```
//!
//! This assumes brightness changes monotonically and linearly between the two
//! samples. That holds when the sample spacing is small relative to the
//! screen's own transition time, and it is the core approximation of the
//! whole measurement: a slow camera against a fast panel will bias every
//! crossing towards the middle of the frame interval.
//!
//! The time offset is computed in integer nanoseconds; only the fraction is
//! floating point.

use latency_traits::{Sample, Timestamp};

/// A detected light/dark boundary event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Interpolated instant at which the level crossed the threshold.
    pub time: Timestamp,
    /// Classification after the crossing.
    pub now_dark: bool,
    /// The interpolation fraction fell outside [0, 1] (or was not finite) and was clamped.
    pub clamped: bool,
}

/// True when `level` counts as dark for the given threshold.
#[inline]
pub fn is_dark(level: f64, threshold: f64) -> bool {
    level <= threshold
}

/// Clamp an interpolation fraction to [0, 1]; NaN maps to 0.
/// Returns the clamped value and whether clamping was needed.
#[inline]
fn clamp_fraction(t: f64) -> (f64, bool) {
    if t.is_nan() {
        return (0.0, true);
    }
    if (0.0..=1.0).contains(&t) {
        (t, false)
    } else {
        (t.clamp(0.0, 1.0), true)
    }
}

/// Detect a threshold crossing between `prev` and `curr`.
///
/// Returns `None` when both samples fall on the same side of the threshold.
pub fn detect(prev: Sample, curr: Sample, threshold: f64) -> Option<Crossing> {
    let was_dark = is_dark(prev.level, threshold);
    let now_dark = is_dark(curr.level, threshold);
    if was_dark == now_dark {
        return None;
    }

    // Levels differ here, but noisy inputs (NaN, ties, inf) must not abort the session.
    let raw = (threshold - prev.level) / (curr.level - prev.level);
    let (t, clamped) = clamp_fraction(raw);

    let gap_ns = curr.timestamp.nanos_since(prev.timestamp);
    let step_ns = (t * gap_ns as f64).round() as i64;
    Some(Crossing {
        time: prev.timestamp.advance(step_ns),
        now_dark,
        clamped,
    })
}
