use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// Light for the first 100 ms, dark afterwards: exactly one crossing.
fn write_step_csv(dir: &Path) -> PathBuf {
    let path = dir.join("step.csv");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "t_s,level").unwrap();
    for i in 1..=300 {
        let level = if i <= 100 { 0.9 } else { 0.1 };
        writeln!(f, "{:.3},{level}", f64::from(i) / 1000.0).unwrap();
    }
    path
}

fn latency() -> Command {
    let mut cmd = Command::cargo_bin("latency").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("LATENCYTOOL_LOG");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--help"], 0, "--max-run-ms", "stdout")]
#[case(&[], 2, "Usage:", "stderr")]
#[case(&["run", "--source", "bogus"], 2, "invalid value", "stderr")]
#[case(&["self-check"], 0, "OK: sim", "stdout")]
#[case(&["run", "--screen", "null", "--max-run-ms", "200", "--seed", "7"], 0, "Session complete", "stdout")]
#[case(&["run", "--screen", "null", "--max-run-ms", "10", "--threshold", "2"], 3, "Invalid analysis settings", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let assert = latency().args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn analyze_replay_writes_one_record_per_sample() {
    let dir = tempdir().unwrap();
    let csv = write_step_csv(dir.path());
    let rec = dir.path().join("rec.log");

    latency()
        .arg("analyze")
        .arg("--replay")
        .arg(&csv)
        .arg("--record")
        .arg(&rec)
        .arg("--seed")
        .arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("300 samples, 1 crossings"));

    let text = fs::read_to_string(&rec).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 300);
    for line in &lines {
        let fields: Vec<&str> = line.split(' ').collect();
        assert_eq!(fields.len(), 3, "bad record line: {line}");
        assert!(matches!(fields[2], "-1" | "0" | "1"));
    }
    assert!(lines[0].starts_with("0.000000000 0.900 "));
}

#[test]
fn record_file_from_environment() {
    let dir = tempdir().unwrap();
    let csv = write_step_csv(dir.path());
    let rec = dir.path().join("env.log");

    latency()
        .env("LATENCYTOOL_LOG", &rec)
        .arg("analyze")
        .arg("--replay")
        .arg(&csv)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&rec).unwrap().lines().count(), 300);
}

#[test]
fn cli_reports_bad_replay_header() {
    let dir = tempdir().unwrap();
    let bad_csv = dir.path().join("bad.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "time,value").unwrap();
    writeln!(f, "0.001,0.5").unwrap();

    latency()
        .arg("analyze")
        .arg("--replay")
        .arg(&bad_csv)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid headers"));
}

#[test]
fn invalid_config_names_the_key() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[analysis]\nhold_min_s = 0.2\nhold_max_s = 0.1\n").unwrap();

    latency()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("analysis.hold_max_s"));
}

#[test]
fn missing_raw_source_is_a_hardware_error() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    let missing = dir.path().join("no_such_stream.raw");
    fs::write(
        &cfg,
        format!(
            "[sensor]\nsource = \"raw\"\nraw_path = {:?}\n",
            missing.to_string_lossy()
        ),
    )
    .unwrap();

    latency()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(4);
}

#[test]
fn raw_frames_from_file_run_to_end_of_stream() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("frames.raw");
    let frame_bytes = 16usize;
    let mut data = Vec::new();
    for i in 0..20 {
        let v = if i < 10 { 230u8 } else { 20u8 };
        data.extend(std::iter::repeat_n(v, frame_bytes));
    }
    fs::write(&raw, &data).unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        format!(
            "[sensor]\nsource = \"raw\"\nraw_path = {:?}\nframe_bytes = {frame_bytes}\n",
            raw.to_string_lossy()
        ),
    )
    .unwrap();

    latency()
        .arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--screen")
        .arg("null")
        .arg("--max-run-ms")
        .arg("2000")
        .assert()
        .success()
        .stdout(predicate::str::contains("20 samples, 1 crossings"));
}
