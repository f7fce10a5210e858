//! Session loop: drive a `LatencyEngine` from a `Sampler` until told to stop.
//!
//! The runner owns no policy of its own. Every cycle it polls, feeds the
//! engine, writes the record, forwards crossings to the caller and renders
//! color changes. Collaborator failures are tolerated except for the record
//! sink, whose loss would silently corrupt the measurement log.
//!
//! The screen starts on the opposite of the engine's displayed color, so the
//! camera sees a transition whatever the panel showed before the session. The
//! runner tracks what it last painted and repaints whenever the engine's
//! displayed color differs from it.

use std::sync::atomic::{AtomicBool, Ordering};

use eyre::WrapErr;
use latency_traits::{Sampler, Screen};

use crate::config::RunParams;
use crate::engine::{CrossingReport, LatencyEngine};
use crate::error::{LatencyError, Result};
use crate::hw_error::map_hw_error;
use crate::record::RecordSink;
use crate::session::SessionSummary;
use crate::util::duration_ns;

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    MaxRun,
    Exhausted,
}

#[inline]
fn sink_err(e: std::io::Error) -> eyre::Report {
    eyre::Report::new(LatencyError::Sink(e.to_string()))
}

/// Run a session and return its summary.
///
/// `on_crossing` is called once per detected crossing with the statistics
/// snapshot taken right after that crossing's delay was recorded.
pub fn run<S, D, K, F>(
    mut engine: LatencyEngine,
    mut sampler: S,
    mut screen: D,
    sink: &mut K,
    params: &RunParams,
    stop: &AtomicBool,
    mut on_crossing: F,
) -> Result<SessionSummary>
where
    S: Sampler,
    D: Screen,
    K: RecordSink + ?Sized,
    F: FnMut(&CrossingReport),
{
    let clock = engine.clock.clone();
    let started = clock.now();

    let mut painted = engine.displayed_color().opposite();
    if let Err(e) = screen.set_color(painted) {
        tracing::warn!(color = ?painted, error = %map_hw_error(e.as_ref()), "initial screen paint failed");
    }
    let mut stall_warned = false;

    let reason = loop {
        if stop.load(Ordering::Relaxed) {
            break StopReason::Requested;
        }
        if let Some(max) = params.max_run {
            if clock.now().nanos_since(started) >= duration_ns(max) {
                break StopReason::MaxRun;
            }
        }
        if sampler.is_exhausted() {
            break StopReason::Exhausted;
        }

        let polled = match sampler.poll() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %map_hw_error(e.as_ref()), "sampler poll failed");
                None
            }
        };

        if polled.is_some() {
            stall_warned = false;
        } else if let (Some(limit), Some(stalled)) = (params.stall_warn, sampler.stalled()) {
            if stalled >= limit && !stall_warned {
                tracing::warn!(stalled_ms = stalled.as_millis() as u64, "sensor delivered no frame");
                stall_warned = true;
            }
        }

        let cycle = engine.update(polled);
        if let Some(rec) = &cycle.record {
            sink.record(rec).map_err(sink_err)?;
        }
        if let Some(report) = &cycle.crossing {
            on_crossing(report);
        }
        let color = engine.displayed_color();
        if color != painted {
            if let Err(e) = screen.set_color(color) {
                tracing::warn!(?color, error = %map_hw_error(e.as_ref()), "screen update failed");
            }
            painted = color;
        }
        if cycle.is_empty() {
            clock.sleep(params.idle_sleep);
        }
    };

    sink.flush()
        .map_err(sink_err)
        .wrap_err("flushing record sink")?;
    tracing::info!(?reason, "session loop stopped");
    Ok(engine.finish())
}
