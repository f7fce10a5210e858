//! Common time helpers for latency_core.

use std::time::Duration;

/// Convert fractional seconds to a `Duration`, mapping negative or non-finite
/// input to zero and saturating at `Duration::MAX`.
#[inline]
pub fn secs_f64_to_duration(s: f64) -> Duration {
    if s.is_finite() && s > 0.0 {
        Duration::try_from_secs_f64(s).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// Saturating conversion of a `Duration` to signed nanoseconds.
#[inline]
pub fn duration_ns(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_to_duration_rejects_garbage() {
        assert_eq!(secs_f64_to_duration(-1.0), Duration::ZERO);
        assert_eq!(secs_f64_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(secs_f64_to_duration(0.04), Duration::from_millis(40));
    }

    #[test]
    fn secs_to_duration_saturates_on_overflow() {
        assert_eq!(secs_f64_to_duration(1e27), Duration::MAX);
        assert_eq!(secs_f64_to_duration(f64::MAX), Duration::MAX);
    }

    #[test]
    fn duration_ns_saturates() {
        assert_eq!(duration_ns(Duration::from_millis(5)), 5_000_000);
        assert_eq!(duration_ns(Duration::MAX), i64::MAX);
    }
}
