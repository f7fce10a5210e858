//! Session assembly: config mapping, collaborator selection and reporting.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use latency_config::{Config, SourceKind};
use latency_core::error::{LatencyError, Result as CoreResult};
use latency_core::mocks::ScriptedSampler;
use latency_core::record::{NullSink, RecordSink, open_record_file};
use latency_core::stats::{Estimate, Moments, Stats};
use latency_core::{
    CrossingReport, EngineCfg, LatencyEngine, RunParams, SessionSummary, StatsLine,
    ThreadedSampler, Timeouts,
};
use latency_hardware::{NullScreen, RawFrameProbe, SimParams, SimRig, TerminalScreen};
use latency_traits::clock::{Clock, MonotonicClock};
use latency_traits::{Sample, Screen, Timestamp};
use serde_json::{Value, json};

use crate::cli::{RECORD_ENV, RtArgs, RtLock, ScreenKind};
use crate::rt::setup_rt_once;

/// CLI overrides layered over the config file.
#[derive(Debug, Default, Clone)]
pub struct RunOpts {
    pub source: Option<SourceKind>,
    pub threshold: Option<f64>,
    pub max_run_ms: Option<u64>,
    pub record: Option<PathBuf>,
    pub screen: ScreenKind,
    pub seed: Option<u64>,
    pub rt: RtArgs,
}

/// Record target: `--record`, then `logging.record_file`, then `$LATENCYTOOL_LOG`.
pub fn record_target(cli: Option<&Path>, cfg: &Config) -> Option<PathBuf> {
    cli.map(Path::to_path_buf)
        .or_else(|| cfg.logging.record_file.as_ref().map(PathBuf::from))
        .or_else(|| {
            std::env::var_os(RECORD_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
}

fn open_sink(target: Option<PathBuf>) -> CoreResult<Box<dyn RecordSink>> {
    match target {
        Some(path) => {
            let sink = open_record_file(&path)
                .map_err(|e| LatencyError::Io(e.to_string()))
                .wrap_err_with(|| format!("open record file {}", path.display()))?;
            tracing::info!(path = %path.display(), "recording samples");
            Ok(Box::new(sink))
        }
        None => Ok(Box::new(NullSink)),
    }
}

fn engine_cfg(cfg: &Config, threshold: Option<f64>, seed: Option<u64>) -> EngineCfg {
    let mut e = EngineCfg::from(&cfg.analysis);
    if let Some(t) = threshold {
        e.threshold = t;
    }
    if seed.is_some() {
        e.seed = seed;
    }
    e
}

fn sim_params(cfg: &Config) -> SimParams {
    let s = &cfg.sim;
    SimParams {
        latency: latency_core::util::secs_f64_to_duration(s.latency_ms / 1e3),
        rise: latency_core::util::secs_f64_to_duration(s.rise_ms / 1e3),
        frame_rate_hz: s.frame_rate_hz,
        noise: s.noise,
        seed: s.seed,
        ..SimParams::default()
    }
}

/// Clock for offline replay: time stands still at the first sample.
#[derive(Debug, Clone, Copy)]
struct ReplayClock(Timestamp);

impl Clock for ReplayClock {
    fn now(&self) -> Timestamp {
        self.0
    }
    fn sleep(&self, _d: Duration) {}
}

fn replay_sampler(path: &Path) -> CoreResult<(ScriptedSampler, Timestamp)> {
    let rows = latency_config::load_replay_csv(path)
        .map_err(|e| LatencyError::Config(format!("{e:#}")))?;
    let start = rows
        .first()
        .map_or(Timestamp::EPOCH, |r| Timestamp::from_secs_f64(r.t_s));
    let samples = rows
        .iter()
        .map(|r| Sample::new(Timestamp::from_secs_f64(r.t_s), r.level));
    tracing::info!(rows = rows.len(), path = %path.display(), "replay loaded");
    Ok((ScriptedSampler::from_samples(samples), start))
}

fn open_screen(kind: ScreenKind) -> CoreResult<Box<dyn Screen>> {
    Ok(match kind {
        ScreenKind::Term => Box::new(
            TerminalScreen::new(std::io::stdout())
                .map_err(|e| LatencyError::Hardware(format!("terminal: {e}")))?,
        ),
        ScreenKind::Null => Box::new(NullScreen),
    })
}

fn apply_rt(rt: &RtArgs) {
    let mode = rt.rt_lock.unwrap_or(RtLock::os_default());
    #[cfg(target_os = "linux")]
    setup_rt_once(rt.rt, rt.rt_prio, mode, rt.rt_cpu);
    #[cfg(not(target_os = "linux"))]
    setup_rt_once(rt.rt, mode);
}

/// Run a measurement session per config and CLI overrides.
pub fn run_measure(
    cfg: &Config,
    opts: &RunOpts,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<SessionSummary> {
    apply_rt(&opts.rt);

    let mut params = RunParams::from(&cfg.runner);
    if let Some(ms) = opts.max_run_ms {
        params.max_run = (ms > 0).then(|| Duration::from_millis(ms));
    }
    let source = opts.source.unwrap_or(cfg.sensor.source);
    tracing::info!(source = source.as_str(), "session start");
    let ecfg = engine_cfg(cfg, opts.threshold, opts.seed);
    let on_crossing = |r: &CrossingReport| report_crossing(r, json);

    match source {
        SourceKind::Replay => {
            let path = cfg.sensor.replay_csv.as_deref().ok_or_else(|| {
                LatencyError::Config("sensor.replay_csv is required for replay".into())
            })?;
            analyze_replay(cfg, Path::new(path), opts, json, shutdown)
        }
        SourceKind::Sim => {
            let clock = MonotonicClock::new();
            let rig = SimRig::new(clock, sim_params(cfg));
            let engine = LatencyEngine::builder()
                .with_config(ecfg)
                .with_clock(clock)
                .build()?;
            let mut sink = open_sink(record_target(opts.record.as_deref(), cfg))?;
            latency_core::run(
                engine,
                rig.camera(),
                rig.screen(),
                sink.as_mut(),
                &params,
                &shutdown,
                on_crossing,
            )
        }
        SourceKind::Raw => {
            let path = cfg.sensor.raw_path.as_deref().ok_or_else(|| {
                LatencyError::Config("sensor.raw_path is required for raw frames".into())
            })?;
            let file = std::fs::File::open(path)
                .map_err(|e| LatencyError::Hardware(format!("open {path}: {e}")))?;
            let probe = RawFrameProbe::new(std::io::BufReader::new(file), cfg.sensor.frame_bytes)
                .map_err(|e| LatencyError::Config(e.to_string()))?;
            let timeouts = Timeouts::from(&cfg.sensor);
            let clock = MonotonicClock::new();
            let engine = LatencyEngine::builder()
                .with_config(ecfg)
                .with_clock(clock)
                .build()?;
            let screen = open_screen(opts.screen)?;
            let mut sink = open_sink(record_target(opts.record.as_deref(), cfg))?;
            let sampler = ThreadedSampler::spawn(
                probe,
                Duration::from_millis(timeouts.sensor_ms),
                clock,
                latency_core::sampler::DEFAULT_QUEUE,
            );
            latency_core::run(
                engine,
                sampler,
                screen,
                sink.as_mut(),
                &params,
                &shutdown,
                on_crossing,
            )
        }
    }
}

/// Replay a recorded CSV through the engine with no screen attached.
pub fn analyze_replay(
    cfg: &Config,
    path: &Path,
    opts: &RunOpts,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<SessionSummary> {
    let (sampler, start) = replay_sampler(path)?;
    let engine = LatencyEngine::builder()
        .with_config(engine_cfg(cfg, opts.threshold, opts.seed))
        .with_clock(ReplayClock(start))
        .build()?;
    let mut sink = open_sink(record_target(opts.record.as_deref(), cfg))?;
    let params = RunParams {
        max_run: None,
        idle_sleep: Duration::ZERO,
        stall_warn: None,
    };
    latency_core::run(
        engine,
        sampler,
        NullScreen,
        sink.as_mut(),
        &params,
        &shutdown,
        |r| report_crossing(r, json),
    )
}

/// Check config plus whether the configured source can be opened.
pub fn self_check(cfg: &Config) -> CoreResult<String> {
    cfg.validate()
        .map_err(|e| LatencyError::Config(format!("{e:#}")))?;
    LatencyEngine::builder()
        .with_config(EngineCfg::from(&cfg.analysis))
        .build()?;
    let detail = match cfg.sensor.source {
        SourceKind::Sim => format!(
            "sim: latency {} ms, {} Hz",
            cfg.sim.latency_ms, cfg.sim.frame_rate_hz
        ),
        SourceKind::Replay => {
            let path = cfg.sensor.replay_csv.as_deref().unwrap_or_default();
            let (sampler, _) = replay_sampler(Path::new(path))?;
            format!("replay: {} samples from {path}", sampler.remaining())
        }
        SourceKind::Raw => {
            let path = cfg.sensor.raw_path.as_deref().unwrap_or_default();
            std::fs::metadata(path)
                .map_err(|e| LatencyError::Hardware(format!("open {path}: {e}")))?;
            format!("raw: {path} ({} bytes/frame)", cfg.sensor.frame_bytes)
        }
    };
    Ok(detail)
}

fn estimate_json(e: Estimate) -> Value {
    e.value().map_or(Value::Null, |v| json!(v))
}

fn moments_json(m: &Moments) -> Value {
    json!({
        "count": m.count,
        "mean_ms": estimate_json(m.mean),
        "stdev_ms": estimate_json(m.stdev),
    })
}

pub fn stats_json(s: &Stats) -> Value {
    json!({
        "min_ms": estimate_json(s.min_abs),
        "max_ms": estimate_json(s.max_abs),
        "total": moments_json(&s.total),
        "l2d": moments_json(&s.l2d),
        "d2l": moments_json(&s.d2l),
    })
}

fn report_crossing(r: &CrossingReport, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "event": "stats",
                "now_dark": r.crossing.now_dark,
                "delay_ms": r.delay_ms,
                "stats": stats_json(&r.stats),
            })
        );
    } else {
        println!("{}", StatsLine(&r.stats));
    }
}

pub fn summary_json(s: &SessionSummary) -> Value {
    let c = &s.counters;
    json!({
        "event": "summary",
        "samples": c.samples,
        "crossings": c.crossings,
        "flips": c.flips,
        "rejected": c.rejected,
        "clamped": c.clamped,
        "stats": stats_json(&s.stats),
        "duration_ms": (s.duration_s * 1e3).round() as u64,
    })
}

pub fn print_summary(s: &SessionSummary, json: bool) {
    if json {
        println!("{}", summary_json(s));
        return;
    }
    let c = &s.counters;
    println!(
        "Session complete: {} samples, {} crossings, {} flips ({} rejected, {} clamped) in {:.3}s",
        c.samples, c.crossings, c.flips, c.rejected, c.clamped, s.duration_s
    );
    println!("{}", StatsLine(&s.stats));
}
