//! End-of-session summary.

use latency_traits::DisplayColor;

use crate::engine::Counters;
use crate::stats::Stats;

/// What a finished session measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub counters: Counters,
    /// Statistics over the final delay window.
    pub stats: Stats,
    /// Delays recorded over the whole session (including warm-up and evicted ones).
    pub delays_recorded: u64,
    pub final_color: DisplayColor,
    /// Span from session start to the last accepted sample.
    pub duration_s: f64,
}
