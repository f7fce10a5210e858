use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use crate::time::Timestamp;

/// Monotonic clock abstraction for capture timestamps and pacing.
///
/// - now(): returns a monotonic `Timestamp`
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - ms_since(): helper to compute elapsed milliseconds from an epoch Timestamp
pub trait Clock {
    fn now(&self) -> Timestamp;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Timestamp) -> u64 {
        let ns = self.now().nanos_since(epoch).max(0);
        (ns / 1_000_000) as u64
    }
}

/// Real-time monotonic clock backed by `std::time::Instant`.
///
/// All instances share one process-wide anchor, so timestamps taken by
/// different clocks (e.g. a probe thread and the main loop) are comparable.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        let _ = anchor();
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Timestamp {
        Timestamp::from(anchor().elapsed())
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
    fn sleep(&self, d: Duration) {
        (**self).sleep(d);
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic test clock whose time can be advanced manually.
    ///
    /// now() = start + offset
    /// sleep(d) advances internal time by d without actually sleeping.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        start: Timestamp,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        /// Clock starting at the epoch.
        pub fn new() -> Self {
            Self::starting_at(Timestamp::EPOCH)
        }

        pub fn starting_at(start: Timestamp) -> Self {
            Self {
                start,
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Set the absolute offset relative to the start (useful for tests).
        pub fn set_offset(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = d;
            }
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Timestamp {
            let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
            self.start.advance_by(off)
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}
