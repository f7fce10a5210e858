#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and replay-file parsing for the latency meter.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; an empty document yields a usable config.
//! - Replay CSV loader enforces headers and rejects non-finite values.
use serde::Deserialize;

/// Replay CSV schema.
///
/// Expected headers:
/// t_s,level
///
/// Example:
/// t_s,level
/// 0.000,0.91
/// 0.010,0.12
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ReplayRow {
    /// Capture time in seconds since an arbitrary origin.
    pub t_s: f64,
    /// Brightness, 0 = dark, 1 = light.
    pub level: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Simulated display/camera loopback.
    #[default]
    Sim,
    /// Offline replay of a recorded CSV.
    Replay,
    /// Raw 8-bit frames from a file or FIFO.
    Raw,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Sim => "sim",
            SourceKind::Replay => "replay",
            SourceKind::Raw => "raw",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sim" => Ok(SourceKind::Sim),
            "replay" => Ok(SourceKind::Replay),
            "raw" => Ok(SourceKind::Raw),
            other => eyre::bail!("unknown sensor source '{other}' (expected sim|replay|raw)"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorCfg {
    pub source: SourceKind,
    /// CSV replayed when `source = "replay"`.
    pub replay_csv: Option<String>,
    /// Frame stream read when `source = "raw"`.
    pub raw_path: Option<String>,
    /// Bytes per raw frame (width * height for 8-bit gray).
    pub frame_bytes: usize,
    /// Max wait per probe read (ms). Also accepts alias "sample_ms".
    #[serde(alias = "sample_ms")]
    pub read_timeout_ms: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            source: SourceKind::Sim,
            replay_csv: None,
            raw_path: None,
            frame_bytes: 320 * 240,
            read_timeout_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisCfg {
    /// Dark/light boundary in normalized brightness.
    pub threshold: f64,
    /// Delays kept for rolling statistics.
    pub capacity: usize,
    /// Leading delays excluded from statistics.
    pub warmup: usize,
    pub hold_min_s: f64,
    pub hold_max_s: f64,
    /// Fixed seed for the hold draw; omit for OS entropy.
    pub seed: Option<u64>,
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            capacity: 100,
            warmup: 2,
            hold_min_s: 0.040,
            hold_max_s: 0.100,
            seed: None,
        }
    }
}

/// Simulated loopback parameters.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    /// Display-to-camera latency being simulated.
    pub latency_ms: f64,
    /// Time for the sensed level to ramp fully to a new color.
    pub rise_ms: f64,
    pub frame_rate_hz: u32,
    /// Peak amplitude of uniform noise added to each level.
    pub noise: f64,
    pub seed: u64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            latency_ms: 30.0,
            rise_ms: 4.0,
            frame_rate_hz: 240,
            noise: 0.02,
            seed: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunnerCfg {
    /// Stop after this many ms; 0 runs until interrupted.
    pub max_run_ms: u64,
    /// Pause after a cycle without a sample.
    pub idle_sleep_us: u64,
    /// Warn when the sensor delivers nothing for this many ms; 0 disables.
    pub stall_warn_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            max_run_ms: 0,
            idle_sleep_us: 500,
            stall_warn_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
    /// Per-sample record file (one `elapsed level code` line per sample).
    pub record_file: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorCfg,
    pub analysis: AnalysisCfg,
    pub sim: SimCfg,
    pub runner: RunnerCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_replay_csv(path: &std::path::Path) -> eyre::Result<Vec<ReplayRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open replay CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["t_s", "level"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "replay CSV must have headers 't_s,level', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<ReplayRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if !row.t_s.is_finite() || row.t_s < 0.0 {
            eyre::bail!("invalid CSV row {}: t_s must be finite and >= 0", idx + 2);
        }
        if !row.level.is_finite() || !(0.0..=1.0).contains(&row.level) {
            eyre::bail!("invalid CSV row {}: level must be in [0.0, 1.0]", idx + 2);
        }
        rows.push(row);
    }
    if rows.is_empty() {
        eyre::bail!("replay CSV {:?} has no samples", path);
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        const MAX_SIM_MS: f64 = 10_000.0;

        // Analysis
        let a = &self.analysis;
        if !a.threshold.is_finite() || !(0.0..=1.0).contains(&a.threshold) {
            eyre::bail!("analysis.threshold must be in [0.0, 1.0]");
        }
        if a.capacity == 0 {
            eyre::bail!("analysis.capacity must be >= 1");
        }
        if a.capacity > 1_000_000 {
            eyre::bail!("analysis.capacity is unreasonably large (>1e6)");
        }
        if !a.hold_min_s.is_finite() || a.hold_min_s < 1e-6 {
            eyre::bail!("analysis.hold_min_s must be >= 1e-6 (1 µs)");
        }
        if !a.hold_max_s.is_finite() || a.hold_max_s < a.hold_min_s {
            eyre::bail!("analysis.hold_max_s must be >= analysis.hold_min_s");
        }
        if a.hold_max_s > 60.0 {
            eyre::bail!("analysis.hold_max_s is unreasonably large (>60s)");
        }

        // Sensor
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }
        match self.sensor.source {
            SourceKind::Replay if self.sensor.replay_csv.is_none() => {
                eyre::bail!("sensor.replay_csv is required when sensor.source = \"replay\"");
            }
            SourceKind::Raw if self.sensor.raw_path.is_none() => {
                eyre::bail!("sensor.raw_path is required when sensor.source = \"raw\"");
            }
            SourceKind::Raw if self.sensor.frame_bytes == 0 => {
                eyre::bail!("sensor.frame_bytes must be >= 1");
            }
            _ => {}
        }

        // Sim
        let s = &self.sim;
        if s.frame_rate_hz == 0 {
            eyre::bail!("sim.frame_rate_hz must be > 0");
        }
        if !s.latency_ms.is_finite() || !(0.0..=MAX_SIM_MS).contains(&s.latency_ms) {
            eyre::bail!("sim.latency_ms must be in [0, {MAX_SIM_MS}]");
        }
        if !s.rise_ms.is_finite() || !(0.0..=MAX_SIM_MS).contains(&s.rise_ms) {
            eyre::bail!("sim.rise_ms must be in [0, {MAX_SIM_MS}]");
        }
        if !s.noise.is_finite() || !(0.0..=0.5).contains(&s.noise) {
            eyre::bail!("sim.noise must be in [0.0, 0.5]");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref() {
            if !matches!(rot, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly");
            }
        }

        Ok(())
    }
}
