#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `latency`: closed-loop display latency meter.

use clap::Parser;
use eyre::WrapErr;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

mod cli;
mod error_fmt;
mod measure;
mod rt;

use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use measure::{RunOpts, analyze_replay, print_summary, run_measure, self_check};

fn main() {
    if let Err(e) = real_main() {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
            tracing::debug!(error = ?e, "full error report");
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main() -> eyre::Result<()> {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "ctrl-c handler not installed");
        }
    }

    match cli.cmd {
        Commands::Run {
            source,
            threshold,
            max_run_ms,
            record,
            screen,
            seed,
            rt,
        } => {
            let opts = RunOpts {
                source: source.map(Into::into),
                threshold,
                max_run_ms,
                record,
                screen,
                seed,
                rt,
            };
            let summary = run_measure(&cfg, &opts, cli.json, shutdown)?;
            print_summary(&summary, cli.json);
        }
        Commands::Analyze {
            replay,
            threshold,
            record,
            seed,
        } => {
            let opts = RunOpts {
                threshold,
                record,
                seed,
                ..RunOpts::default()
            };
            let summary = analyze_replay(&cfg, &replay, &opts, cli.json, shutdown)?;
            print_summary(&summary, cli.json);
        }
        Commands::SelfCheck => {
            let detail = self_check(&cfg)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "event": "self_check", "ok": true, "source": detail })
                );
            } else {
                println!("OK: {detail}");
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> eyre::Result<latency_config::Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            latency_config::load_toml(&text)
                .wrap_err_with(|| format!("parse config {}", p.display()))?
        }
        None => latency_config::Config::default(),
    };
    cfg.validate().map_err(|e| {
        eyre::Report::new(latency_core::LatencyError::Config(format!("{e:#}")))
    })?;
    Ok(cfg)
}

fn init_tracing(
    json: bool,
    level: Option<&str>,
    logging: &latency_config::Logging,
) -> eyre::Result<()> {
    let level = level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level '{level}'"))?;

    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file_layer = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    Registry::default()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
