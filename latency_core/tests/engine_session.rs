//! End-to-end scripted sessions through the engine and the runner.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use latency_core::mocks::{RecordingScreen, ScriptedSampler};
use latency_core::record::MemorySink;
use latency_core::{LatencyEngine, RunParams, run};
use latency_traits::clock::test_clock::TestClock;
use latency_traits::{DisplayColor, Sample, Timestamp};

fn s(ms: i64, level: f64) -> Sample {
    Sample::new(Timestamp::from_millis(ms), level)
}

fn fixed_hold_engine(clock: TestClock) -> LatencyEngine {
    LatencyEngine::builder()
        .with_clock(clock)
        .with_threshold(0.5)
        .with_hold(Duration::from_millis(50), Duration::from_millis(50))
        .with_seed(11)
        .build()
        .unwrap()
}

#[test]
fn scripted_session_emits_expected_codes() {
    let clock = TestClock::new();
    let engine = fixed_hold_engine(clock);
    let sampler = ScriptedSampler::from_samples([
        s(0, 0.9),
        s(10, 0.1),
        s(200, 0.1),
        s(210, 0.9),
        s(400, 0.9),
    ]);
    let mut screen = RecordingScreen::default();
    let mut sink = MemorySink::default();
    let mut crossings = Vec::new();
    let stop = AtomicBool::new(false);

    let summary = run(
        engine,
        sampler,
        &mut screen,
        &mut sink,
        &RunParams::default(),
        &stop,
        |r| crossings.push(*r),
    )
    .unwrap();

    let codes: Vec<i8> = sink.records.iter().map(|r| r.code).collect();
    assert_eq!(codes, vec![0, 0, -1, 0, 1]);
    // Initial paint is the opposite of the engine's Light; the first commit
    // re-affirms Light, which the screen still has to show.
    assert_eq!(
        screen.calls,
        vec![DisplayColor::Dark, DisplayColor::Light, DisplayColor::Dark]
    );

    assert_eq!(crossings.len(), 2);
    assert_eq!(crossings[0].crossing.time, Timestamp::from_millis(5));
    assert!(crossings[0].crossing.now_dark);
    assert_eq!(crossings[0].next_switch, Timestamp::from_millis(55));
    assert_eq!(crossings[1].crossing.time, Timestamp::from_millis(205));
    assert!((crossings[1].delay_ms - 150.0).abs() < 1e-9);

    assert_eq!(summary.counters.samples, 5);
    assert_eq!(summary.counters.crossings, 2);
    assert_eq!(summary.counters.commits, 2);
    assert_eq!(summary.counters.flips, 1);
    assert_eq!(summary.final_color, DisplayColor::Dark);
    // Both delays fall in the warm-up.
    assert_eq!(summary.delays_recorded, 2);
    assert_eq!(summary.stats.count_total(), 0);
    assert!((summary.duration_s - 0.4).abs() < 1e-12);
}

#[test]
fn four_sample_session_crosses_midway_and_commits_light() {
    let clock = TestClock::new();
    let engine = LatencyEngine::builder()
        .with_clock(clock)
        .with_threshold(0.5)
        .with_hold(Duration::from_millis(10), Duration::from_millis(10))
        .with_seed(5)
        .build()
        .unwrap();
    let sampler =
        ScriptedSampler::from_samples([s(0, 0.9), s(10, 0.9), s(20, 0.1), s(30, 0.1)]);
    let mut screen = RecordingScreen::default();
    let mut sink = MemorySink::default();
    let mut crossings = Vec::new();
    let stop = AtomicBool::new(false);

    let summary = run(
        engine,
        sampler,
        &mut screen,
        &mut sink,
        &RunParams::default(),
        &stop,
        |r| crossings.push(*r),
    )
    .unwrap();

    // interpolated between the 10 ms and 20 ms samples
    assert_eq!(crossings.len(), 1);
    let x = crossings[0];
    assert_eq!(x.crossing.time, Timestamp::from_millis(15));
    assert!(x.crossing.now_dark);
    assert!((x.delay_ms - 15.0).abs() < 1e-9);
    assert_eq!(x.next_switch, Timestamp::from_millis(25));

    let codes: Vec<i8> = sink.records.iter().map(|r| r.code).collect();
    assert_eq!(codes, vec![0, 0, 0, -1]);
    // the commit answers the dark camera with Light, which the engine already showed
    assert_eq!(summary.counters.commits, 1);
    assert_eq!(summary.counters.flips, 0);
    assert_eq!(summary.final_color, DisplayColor::Light);
    assert_eq!(screen.calls, vec![DisplayColor::Dark, DisplayColor::Light]);
}

#[test]
fn record_elapsed_is_relative_to_session_start() {
    let clock = TestClock::starting_at(Timestamp::from_millis(1_000));
    let mut engine = fixed_hold_engine(clock);
    let cycle = engine.update(Some(s(1_250, 0.8)));
    let rec = cycle.record.expect("record");
    assert!((rec.elapsed_s - 0.25).abs() < 1e-12);
    assert_eq!(rec.to_string(), "0.250000000 0.800 0");
}

#[test]
fn empty_cycles_produce_no_record() {
    let mut engine = fixed_hold_engine(TestClock::new());
    let c = engine.update(None);
    assert!(c.is_empty());
    assert!(c.crossing.is_none());
    assert_eq!(engine.counters().empty_cycles, 1);
    assert_eq!(engine.counters().samples, 0);
}

#[test]
fn empty_cycle_does_not_advance_the_commit_clock() {
    let mut engine = fixed_hold_engine(TestClock::new());
    engine.update(Some(s(0, 0.9)));
    engine.update(Some(s(10, 0.1)));
    assert!(engine.pending_flip().is_some());
    for _ in 0..100 {
        assert!(engine.update(None).new_color.is_none());
    }
    assert!(engine.pending_flip().is_some());
}

#[test]
fn regressing_timestamp_is_rejected() {
    let mut engine = fixed_hold_engine(TestClock::new());
    engine.update(Some(s(100, 0.9)));
    let c = engine.update(Some(s(50, 0.1)));
    assert!(c.is_empty());
    assert_eq!(engine.counters().rejected, 1);
    assert_eq!(engine.previous_sample(), s(100, 0.9));
    // no crossing was detected against the rejected sample
    assert_eq!(engine.counters().crossings, 0);
}

#[test]
fn signed_delays_split_by_direction() {
    let mut engine = LatencyEngine::builder()
        .with_clock(TestClock::new())
        .with_hold(Duration::from_millis(50), Duration::from_millis(50))
        .with_warmup(0)
        .with_seed(1)
        .build()
        .unwrap();
    // light -> dark at 5ms: delay 5ms against the epoch
    engine.update(Some(s(0, 0.9)));
    engine.update(Some(s(10, 0.1)));
    // dark -> light at 75ms: 20ms after the 55ms switch
    engine.update(Some(s(70, 0.1)));
    engine.update(Some(s(80, 0.9)));
    let st = engine.stats();
    assert_eq!(st.l2d.count, 1);
    assert_eq!(st.d2l.count, 1);
    assert_eq!(st.l2d.mean.value(), Some(5.0));
    assert_eq!(st.d2l.mean.value(), Some(20.0));
    assert_eq!(st.min_abs.value(), Some(5.0));
    assert_eq!(st.max_abs.value(), Some(20.0));
    assert_eq!(st.total.mean.value(), Some(12.5));
}

#[test]
fn threshold_tie_counts_as_dark() {
    let mut engine = fixed_hold_engine(TestClock::new());
    engine.update(Some(s(0, 0.9)));
    let c = engine.update(Some(s(10, 0.5)));
    let x = c.crossing.expect("crossing");
    assert!(x.crossing.now_dark);
    assert!(!x.crossing.clamped);
    assert_eq!(x.crossing.time, Timestamp::from_millis(10));
}

#[test]
fn non_finite_level_is_clamped_and_counted() {
    let mut engine = fixed_hold_engine(TestClock::new());
    engine.update(Some(s(0, f64::NAN)));
    let c = engine.update(Some(s(10, 0.1)));
    let x = c.crossing.expect("crossing");
    assert!(x.crossing.clamped);
    assert_eq!(x.crossing.time, Timestamp::EPOCH);
    assert_eq!(engine.counters().clamped, 1);
}
