use latency_config::{SourceKind, load_toml};
use rstest::rstest;

#[test]
fn empty_document_uses_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.sensor.source, SourceKind::Sim);
    assert_eq!(cfg.analysis.capacity, 100);
    assert_eq!(cfg.analysis.warmup, 2);
    assert!((cfg.analysis.hold_min_s - 0.040).abs() < 1e-12);
    assert!((cfg.analysis.hold_max_s - 0.100).abs() < 1e-12);
    assert!(cfg.analysis.seed.is_none());
}

#[test]
fn full_document_parses() {
    let toml = r#"
[sensor]
source = "replay"
replay_csv = "trace.csv"
sample_ms = 20

[analysis]
threshold = 0.35
capacity = 50
warmup = 0
hold_min_s = 0.05
hold_max_s = 0.05
seed = 42

[sim]
latency_ms = 12.5
frame_rate_hz = 120

[runner]
max_run_ms = 10000

[logging]
level = "debug"
rotation = "daily"
record_file = "samples.log"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid");
    assert_eq!(cfg.sensor.source, SourceKind::Replay);
    assert_eq!(cfg.sensor.read_timeout_ms, 20);
    assert_eq!(cfg.analysis.seed, Some(42));
    assert_eq!(cfg.sim.frame_rate_hz, 120);
    assert_eq!(cfg.runner.max_run_ms, 10_000);
    assert_eq!(cfg.logging.record_file.as_deref(), Some("samples.log"));
}

#[rstest]
#[case("[analysis]\nthreshold = 1.5", "analysis.threshold")]
#[case("[analysis]\nthreshold = -0.1", "analysis.threshold")]
#[case("[analysis]\ncapacity = 0", "analysis.capacity")]
#[case("[analysis]\nhold_min_s = 0.0", "analysis.hold_min_s")]
#[case("[analysis]\nhold_min_s = 0.2\nhold_max_s = 0.1", "analysis.hold_max_s")]
#[case("[sensor]\nread_timeout_ms = 0", "sensor.read_timeout_ms")]
#[case("[sensor]\nsource = \"replay\"", "sensor.replay_csv")]
#[case("[sensor]\nsource = \"raw\"", "sensor.raw_path")]
#[case("[sim]\nframe_rate_hz = 0", "sim.frame_rate_hz")]
#[case("[sim]\nnoise = 0.9", "sim.noise")]
#[case("[sim]\nlatency_ms = 1e30", "sim.latency_ms")]
#[case("[sim]\nlatency_ms = -1.0", "sim.latency_ms")]
#[case("[sim]\nrise_ms = 20000.0", "sim.rise_ms")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_invalid_values(#[case] toml: &str, #[case] key: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(err.to_string().contains(key), "{err} should name {key}");
}

#[test]
fn unknown_source_fails_to_parse() {
    assert!(load_toml("[sensor]\nsource = \"v4l2\"").is_err());
}

#[rstest]
#[case("sim", SourceKind::Sim)]
#[case(" Replay ", SourceKind::Replay)]
#[case("RAW", SourceKind::Raw)]
fn source_kind_from_str(#[case] s: &str, #[case] expected: SourceKind) {
    assert_eq!(s.parse::<SourceKind>().unwrap(), expected);
}
