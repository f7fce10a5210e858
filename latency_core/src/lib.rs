#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Display latency analysis (hardware-agnostic).
//!
//! The engine closes a loop between a screen and a brightness sensor: it
//! watches the sensed level cross a threshold, waits a randomized hold, then
//! commands the opposite color. The time between a commanded switch and the
//! crossing that follows it is the measured latency. All hardware goes
//! through `latency_traits::{Sampler, Probe, Screen}`.
//!
//! ## Architecture
//!
//! - **Detection**: sub-sample crossing time by linear interpolation (`detector`)
//! - **Scheduling**: randomized hold before each flip (`scheduler`)
//! - **Statistics**: ring of recent delays, pooled and per direction (`stats`)
//! - **Engine**: one `update` per sensor cycle (`engine`, built via `builder`)
//! - **Records**: per-sample log lines and summary lines (`record`)
//! - **Runner**: session loop over sampler, screen and record sink (`runner`)

pub mod builder;
pub mod config;
pub mod conversions;
pub mod detector;
pub mod engine;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod record;
pub mod runner;
pub mod sampler;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod util;

pub use builder::EngineBuilder;
pub use config::{EngineCfg, RunParams, Timeouts};
pub use detector::Crossing;
pub use engine::{Counters, CrossingReport, Cycle, LatencyEngine};
pub use error::{BuildError, LatencyError, Result};
pub use record::{RecordSink, SampleRecord, StatsLine};
pub use runner::{StopReason, run};
pub use sampler::ThreadedSampler;
pub use session::SessionSummary;
pub use stats::{DelayRing, Estimate, Moments, Stats};
