//! Integer monotonic timestamps.
//!
//! Capture times are kept as whole seconds plus a sub-second nanosecond part so
//! that differencing and advancing stay exact over arbitrarily long sessions.
//! Floating point only appears at the edges (reporting in ms/s).

use std::time::Duration;

/// Number of nanoseconds in one second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;
/// Number of nanoseconds in one millisecond.
pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// A point on a monotonic time line.
///
/// Invariant: `nanos < NANOS_PER_SEC`. Ordering is lexicographic on
/// `(secs, nanos)`, which matches chronological order under the invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    /// Origin of the monotonic time line.
    pub const EPOCH: Timestamp = Timestamp { secs: 0, nanos: 0 };

    /// Build from seconds and a nanosecond part; excess nanoseconds carry into seconds.
    pub fn new(secs: i64, nanos: u32) -> Self {
        Self::EPOCH
            .advance(secs.saturating_mul(NANOS_PER_SEC))
            .advance(i64::from(nanos))
    }

    /// Timestamp `ns` nanoseconds after (or before, if negative) the epoch.
    #[inline]
    pub fn from_nanos(ns: i64) -> Self {
        Self::EPOCH.advance(ns)
    }

    /// Timestamp `ms` milliseconds after the epoch.
    #[inline]
    pub fn from_millis(ms: i64) -> Self {
        Self::from_nanos(ms.saturating_mul(NANOS_PER_MILLI))
    }

    /// Timestamp from fractional seconds, rounded to the nearest nanosecond.
    /// Non-finite input maps to the epoch.
    pub fn from_secs_f64(s: f64) -> Self {
        if !s.is_finite() {
            return Self::EPOCH;
        }
        let secs = s.floor();
        let nanos = ((s - secs) * NANOS_PER_SEC as f64).round() as i64;
        Self {
            secs: secs as i64,
            nanos: 0,
        }
        .advance(nanos)
    }

    #[inline]
    pub fn secs(&self) -> i64 {
        self.secs
    }

    #[inline]
    pub fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    /// Signed nanoseconds from `earlier` to `self` (negative if `self` is earlier).
    /// Saturates at the `i64` range.
    #[inline]
    pub fn nanos_since(self, earlier: Timestamp) -> i64 {
        let dsec = self.secs.saturating_sub(earlier.secs);
        let dnsec = i64::from(self.nanos) - i64::from(earlier.nanos);
        dsec.saturating_mul(NANOS_PER_SEC).saturating_add(dnsec)
    }

    /// Signed milliseconds from `earlier` to `self`.
    #[inline]
    pub fn millis_since(self, earlier: Timestamp) -> f64 {
        self.nanos_since(earlier) as f64 * 1e-6
    }

    /// Signed seconds from `earlier` to `self`.
    #[inline]
    pub fn secs_since(self, earlier: Timestamp) -> f64 {
        self.nanos_since(earlier) as f64 * 1e-9
    }

    /// Seconds since the epoch.
    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        self.secs_since(Self::EPOCH)
    }

    /// Move by `step_nanos` (may be negative), carrying or borrowing whole seconds.
    pub fn advance(self, step_nanos: i64) -> Timestamp {
        let mut secs = self
            .secs
            .saturating_add(step_nanos.div_euclid(NANOS_PER_SEC));
        // rem_euclid is in [0, 1e9), so the sum is in [0, 2e9)
        let mut nanos = i64::from(self.nanos) + step_nanos.rem_euclid(NANOS_PER_SEC);
        if nanos >= NANOS_PER_SEC {
            nanos -= NANOS_PER_SEC;
            secs = secs.saturating_add(1);
        }
        Timestamp {
            secs,
            nanos: nanos as u32,
        }
    }

    /// Move forward by a `Duration`, saturating for absurdly large values.
    #[inline]
    pub fn advance_by(self, d: Duration) -> Timestamp {
        let ns = i64::try_from(d.as_nanos()).unwrap_or(i64::MAX);
        self.advance(ns)
    }
}

impl From<Duration> for Timestamp {
    fn from(d: Duration) -> Self {
        let secs = i64::try_from(d.as_secs()).unwrap_or(i64::MAX);
        Timestamp {
            secs,
            nanos: d.subsec_nanos(),
        }
    }
}
