use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_replay(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("replay.csv");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "t_s,level").unwrap();
    // Dark -> light -> dark with 2 ms spacing
    for i in 1..=200 {
        let level = match i {
            0..=50 => 0.05,
            51..=120 => 0.95,
            _ => 0.05,
        };
        writeln!(f, "{:.3},{level}", f64::from(i) * 0.002).unwrap();
    }
    path
}

fn json_lines(out: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(out)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not JSON ({e}): {l}")))
        .collect()
}

fn assert_number_or_null(v: &serde_json::Value, key: &str) {
    let ok = match v.get(key) {
        Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some(),
        _ => false,
    };
    assert!(ok, "{key} should be number or null in {v}");
}

fn assert_stats_schema(stats: &serde_json::Value) {
    assert_number_or_null(stats, "min_ms");
    assert_number_or_null(stats, "max_ms");
    for group in ["total", "l2d", "d2l"] {
        let m = &stats[group];
        assert!(m.get("count").and_then(|x| x.as_u64()).is_some());
        assert_number_or_null(m, "mean_ms");
        assert_number_or_null(m, "stdev_ms");
    }
}

/// Every stdout line is JSON; the last one is the session summary.
#[rstest]
fn jsonl_replay_schema() {
    let dir = tempdir().unwrap();
    let csv = write_replay(&dir);

    let out = Command::cargo_bin("latency")
        .unwrap()
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("analyze")
        .arg("--replay")
        .arg(&csv)
        .arg("--seed")
        .arg("3")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = json_lines(&out);

    let stats: Vec<_> = lines.iter().filter(|v| v["event"] == "stats").collect();
    // The first dark sample crosses against the light sentinel, then two steps.
    assert_eq!(stats.len(), 3, "one stats line per crossing");
    for v in &stats {
        assert!(v["now_dark"].is_boolean());
        assert!(v["delay_ms"].as_f64().is_some());
        assert_stats_schema(&v["stats"]);
    }

    let summary = lines.last().unwrap();
    assert_eq!(summary["event"], "summary");
    assert_eq!(summary["samples"], 200);
    assert_eq!(summary["crossings"], 3);
    for key in ["flips", "rejected", "clamped", "duration_ms"] {
        assert!(summary.get(key).and_then(|x| x.as_u64()).is_some(), "{key}");
    }
    assert_stats_schema(&summary["stats"]);
    // Two of the three delays sit inside the default warm-up.
    assert_eq!(summary["stats"]["total"]["count"], 1);
    assert!(summary["stats"]["total"]["mean_ms"].is_number());
    assert!(summary["stats"]["total"]["stdev_ms"].is_null());
}

#[rstest]
fn jsonl_sim_run_summary() {
    let out = Command::cargo_bin("latency")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("run")
        .arg("--source")
        .arg("sim")
        .arg("--max-run-ms")
        .arg("300")
        .arg("--seed")
        .arg("5")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = json_lines(&out);
    let summary = lines.last().unwrap();
    assert_eq!(summary["event"], "summary");
    assert!(summary["samples"].as_u64().unwrap() > 0);
    assert!(summary["duration_ms"].as_u64().unwrap() <= 300);
}

/// Errors in --json mode are a single JSON object on stderr.
#[rstest]
fn jsonl_error_schema() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.csv");

    let out = Command::cargo_bin("latency")
        .unwrap()
        .arg("--json")
        .arg("analyze")
        .arg("--replay")
        .arg(&missing)
        .assert()
        .code(3)
        .get_output()
        .stderr
        .clone();
    let err = json_lines(&out)
        .into_iter()
        .find(|v| v["event"] == "error")
        .expect("error line");
    assert_eq!(err["reason"], "InvalidConfig");
    assert_eq!(err["exit_code"], 3);
    assert!(err["message"].as_str().unwrap().contains("What happened"));
}
