//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Environment variable naming a record file when neither the CLI nor the config does.
pub const RECORD_ENV: &str = "LATENCYTOOL_LOG";

#[derive(Parser, Debug)]
#[command(name = "latency", version, about = "Display latency meter")]
pub struct Cli {
    /// Path to config TOML (typed); built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); overrides logging.level, default info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        #[cfg(target_os = "linux")]
        {
            return RtLock::Current;
        }
        #[allow(unreachable_code)]
        RtLock::None
    }
}

/// Where commanded colors are rendered.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum ScreenKind {
    /// Fill this terminal with truecolor background
    #[default]
    Term,
    /// Render nothing
    Null,
}

/// Sensor source override (mirrors `sensor.source`).
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SourceArg {
    Sim,
    Replay,
    Raw,
}

impl From<SourceArg> for latency_config::SourceKind {
    fn from(s: SourceArg) -> Self {
        match s {
            SourceArg::Sim => latency_config::SourceKind::Sim,
            SourceArg::Replay => latency_config::SourceKind::Replay,
            SourceArg::Raw => latency_config::SourceKind::Raw,
        }
    }
}

/// Real-time scheduling knobs.
#[derive(Args, Debug, Clone, Default)]
pub struct RtArgs {
    /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Enable real-time mode on supported OSes.\n\nLinux: Attempts SCHED_FIFO priority, pins to one CPU, and calls mlockall to keep the process resident. This reduces capture and render jitter but may require CAP_SYS_NICE / CAP_IPC_LOCK or root."
    )]
    pub rt: bool,
    /// Real-time priority for SCHED_FIFO on Linux (1..=max)
    #[arg(long, value_name = "PRIO")]
    pub rt_prio: Option<i32>,
    /// Select memory locking mode for --rt: none, current, or all
    #[arg(long, value_enum, value_name = "MODE")]
    pub rt_lock: Option<RtLock>,
    /// CPU index to pin the process to when --rt is enabled (Linux only). Defaults to 0.
    #[arg(long, value_name = "CPU")]
    pub rt_cpu: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a closed-loop latency measurement
    Run {
        /// Sensor source (overrides sensor.source)
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
        /// Dark/light threshold in [0, 1] (overrides analysis.threshold)
        #[arg(long)]
        threshold: Option<f64>,
        /// Stop after this many ms (overrides runner.max_run_ms)
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
        /// Per-sample record file (overrides logging.record_file and $LATENCYTOOL_LOG)
        #[arg(long, value_name = "FILE")]
        record: Option<PathBuf>,
        /// Output screen for raw sources
        #[arg(long, value_enum, default_value = "term")]
        screen: ScreenKind,
        /// Fixed seed for hold times (overrides analysis.seed)
        #[arg(long)]
        seed: Option<u64>,
        #[command(flatten)]
        rt: RtArgs,
    },
    /// Replay a recorded `t_s,level` CSV through the analysis offline
    Analyze {
        /// Replay CSV path
        #[arg(long, value_name = "FILE")]
        replay: PathBuf,
        /// Dark/light threshold in [0, 1] (overrides analysis.threshold)
        #[arg(long)]
        threshold: Option<f64>,
        /// Per-sample record file
        #[arg(long, value_name = "FILE")]
        record: Option<PathBuf>,
        /// Fixed seed for hold times (overrides analysis.seed)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Validate configuration and sensor availability
    SelfCheck,
}
