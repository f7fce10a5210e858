#![no_main]
use libfuzzer_sys::arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use latency_core::detector::detect;
use latency_traits::{Sample, Timestamp};

#[derive(Debug, Arbitrary)]
struct Input {
    t0_ns: i32,
    dt_ns: u32,
    prev: f64,
    curr: f64,
    threshold: u16,
}

fuzz_target!(|inp: Input| {
    let t0 = Timestamp::from_nanos(i64::from(inp.t0_ns));
    let t1 = t0.advance(i64::from(inp.dt_ns));
    let threshold = f64::from(inp.threshold) / f64::from(u16::MAX);
    let prev = Sample::new(t0, inp.prev);
    let curr = Sample::new(t1, inp.curr);
    if let Some(c) = detect(prev, curr, threshold) {
        assert!(c.time >= t0 && c.time <= t1, "crossing outside sample span");
    }
});
