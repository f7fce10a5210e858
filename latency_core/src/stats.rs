//! Rolling statistics over the most recent transition delays.
//!
//! Delays are stored signed in milliseconds: positive for light->dark
//! transitions, negative (or zero) for dark->light. `record` is O(1) and
//! `snapshot` is O(capacity), so both are safe to call at full frame rate.
//!
//! The first `warmup` recorded delays are never statistics input. The very
//! first crossings of a session are measured against the epoch (nothing was
//! scheduled yet) and would otherwise dominate every aggregate.

use core::fmt;

/// Default ring capacity (tradeoff between convergence and responsiveness).
pub const DEFAULT_CAPACITY: usize = 100;
/// Default number of leading delays excluded from statistics.
pub const DEFAULT_WARMUP: usize = 2;

/// An optional statistic; `None` means "not enough data", never zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Estimate(pub Option<f64>);

impl Estimate {
    pub const NA: Estimate = Estimate(None);

    #[inline]
    pub fn value(self) -> Option<f64> {
        self.0
    }

    #[inline]
    pub fn is_available(self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => match f.precision() {
                Some(p) => write!(f, "{v:.p$}"),
                None => write!(f, "{v}"),
            },
            None => f.pad("n/a"),
        }
    }
}

/// Count/mean/stdev of one partition of the window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub count: usize,
    pub mean: Estimate,
    pub stdev: Estimate,
}

/// Running sums used to derive `Moments`.
#[derive(Debug, Clone, Copy, Default)]
struct Sums {
    n: usize,
    sum: f64,
    sum_sq: f64,
}

impl Sums {
    #[inline]
    fn push(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        self.sum_sq += x * x;
    }

    #[inline]
    fn merged(self, other: Sums) -> Sums {
        Sums {
            n: self.n + other.n,
            sum: self.sum + other.sum,
            sum_sq: self.sum_sq + other.sum_sq,
        }
    }

    fn moments(self) -> Moments {
        Moments {
            count: self.n,
            mean: mean(self.n, self.sum),
            stdev: stdev(self.n, self.sum, self.sum_sq),
        }
    }
}

/// `sum / n`, unavailable for an empty partition.
#[inline]
fn mean(n: usize, sum: f64) -> Estimate {
    if n > 0 {
        Estimate(Some(sum / n as f64))
    } else {
        Estimate::NA
    }
}

/// Unbiased sample standard deviation; requires more than two values.
#[inline]
fn stdev(n: usize, sum: f64, sum_sq: f64) -> Estimate {
    if n > 2 {
        let nf = n as f64;
        // rounding can push a zero variance slightly negative
        let var = ((sum_sq - sum * sum / nf) / (nf - 1.0)).max(0.0);
        Estimate(Some(var.sqrt()))
    } else {
        Estimate::NA
    }
}

/// Pooled and per-direction statistics over the current window, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stats {
    pub total: Moments,
    pub min_abs: Estimate,
    pub max_abs: Estimate,
    /// Light -> dark delays.
    pub l2d: Moments,
    /// Dark -> light delays (reported as positive magnitudes).
    pub d2l: Moments,
}

impl Stats {
    #[inline]
    pub fn count_total(&self) -> usize {
        self.total.count
    }
}

/// Fixed-capacity circular buffer of signed delays.
#[derive(Debug, Clone)]
pub struct DelayRing {
    slots: Vec<f64>,
    frame_count: u64,
    warmup: usize,
}

impl DelayRing {
    /// Ring with the default warm-up. Returns `None` for a zero capacity.
    pub fn new(capacity: usize) -> Option<Self> {
        Self::with_warmup(capacity, DEFAULT_WARMUP)
    }

    pub fn with_warmup(capacity: usize, warmup: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(Self {
            slots: vec![0.0; capacity],
            frame_count: 0,
            warmup,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Total number of delays ever recorded.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Number of entries the next snapshot will include.
    pub fn window_len(&self) -> usize {
        let eligible = self.frame_count.saturating_sub(self.warmup as u64);
        usize::try_from(eligible)
            .unwrap_or(usize::MAX)
            .min(self.capacity())
    }

    /// Store a signed delay in ms, overwriting the oldest slot once full.
    #[inline]
    pub fn record(&mut self, delay_ms: f64) {
        let idx = (self.frame_count % self.capacity() as u64) as usize;
        self.slots[idx] = delay_ms;
        self.frame_count += 1;
    }

    /// Most recent entries first, limited to the statistics window.
    pub fn recent(&self) -> impl Iterator<Item = f64> + '_ {
        let cap = self.capacity() as u64;
        let head = self.frame_count;
        (0..self.window_len() as u64).map(move |i| {
            let idx = ((head + cap - 1 - i) % cap) as usize;
            self.slots[idx]
        })
    }

    /// Compute pooled and per-direction statistics over the window.
    pub fn snapshot(&self) -> Stats {
        let mut l2d = Sums::default();
        let mut d2l = Sums::default();
        let mut min_abs: Option<f64> = None;
        let mut max_abs: Option<f64> = None;

        for d in self.recent() {
            if d > 0.0 {
                l2d.push(d);
            } else {
                d2l.push(-d);
            }
            let a = d.abs();
            min_abs = Some(min_abs.map_or(a, |m| m.min(a)));
            max_abs = Some(max_abs.map_or(a, |m| m.max(a)));
        }

        Stats {
            total: l2d.merged(d2l).moments(),
            min_abs: Estimate(min_abs),
            max_abs: Estimate(max_abs),
            l2d: l2d.moments(),
            d2l: d2l.moments(),
        }
    }
}
