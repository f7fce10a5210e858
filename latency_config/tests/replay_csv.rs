use std::fs::File;
use std::io::Write;

use latency_config::{ReplayRow, load_replay_csv};
use rstest::rstest;
use tempfile::tempdir;

fn write_csv(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");
    let mut f = File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    (dir, path)
}

#[rstest]
fn loads_rows_in_order() {
    let (_dir, path) = write_csv("t_s,level\n0.000,0.9\n0.010, 0.1\n");
    let rows = load_replay_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            ReplayRow { t_s: 0.0, level: 0.9 },
            ReplayRow { t_s: 0.01, level: 0.1 },
        ]
    );
}

#[rstest]
fn rejects_wrong_headers() {
    let (_dir, path) = write_csv("time,brightness\n0.0,0.5\n");
    let err = load_replay_csv(&path).unwrap_err();
    assert!(err.to_string().contains("t_s,level"));
}

#[rstest]
#[case("t_s,level\n0.0,1.2\n", "level must be in")]
#[case("t_s,level\n-1.0,0.5\n", "t_s must be finite")]
#[case("t_s,level\n0.0,bright\n", "invalid CSV row 2")]
#[case("t_s,level\n", "no samples")]
fn rejects_bad_rows(#[case] body: &str, #[case] needle: &str) {
    let (_dir, path) = write_csv(body);
    let err = load_replay_csv(&path).unwrap_err();
    assert!(err.to_string().contains(needle), "{err}");
}

#[rstest]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = load_replay_csv(&dir.path().join("nope.csv")).unwrap_err();
    assert!(err.to_string().contains("open replay CSV"));
}
