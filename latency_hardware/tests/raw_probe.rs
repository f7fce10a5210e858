use std::io::{Cursor, Read};
use std::time::Duration;

use latency_hardware::RawFrameProbe;
use latency_hardware::error::HwError;
use latency_traits::Probe;
use rstest::rstest;

#[rstest]
#[case(vec![0u8; 4], 0.0)]
#[case(vec![255u8; 4], 1.0)]
#[case(vec![0, 255, 0, 255], 0.5)]
fn frame_mean_is_normalized(#[case] frame: Vec<u8>, #[case] expected: f64) {
    let mut probe = RawFrameProbe::new(Cursor::new(frame), 4).unwrap();
    let level = probe.read(Duration::from_millis(5)).unwrap();
    assert!((level - expected).abs() < 1e-12);
}

#[test]
fn consecutive_frames_and_end_of_stream() {
    let mut data = vec![255u8; 2];
    data.extend([0u8; 2]);
    let mut probe = RawFrameProbe::new(Cursor::new(data), 2).unwrap();
    assert_eq!(probe.read_frame().unwrap(), 1.0);
    assert_eq!(probe.read_frame().unwrap(), 0.0);
    assert!(!probe.is_closed());
    assert!(matches!(probe.read_frame(), Err(HwError::EndOfStream)));
    assert!(probe.is_closed());
}

#[test]
fn truncated_frame_is_reported_and_buffer_returned() {
    let mut probe = RawFrameProbe::new(Cursor::new(vec![10u8; 3]), 4).unwrap();
    let before = probe.pool().available();
    match probe.read_frame() {
        Err(HwError::ShortFrame { expected: 4, got: 3 }) => {}
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(probe.pool().available(), before);
}

struct Flaky;

impl Read for Flaky {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"))
    }
}

#[test]
fn timed_out_read_maps_to_timeout() {
    let mut probe = RawFrameProbe::new(Flaky, 8).unwrap();
    assert!(matches!(probe.read_frame(), Err(HwError::Timeout)));
    assert!(!probe.is_closed());
}
