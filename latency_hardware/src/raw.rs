//! Raw 8-bit frame probe.
//!
//! Reads fixed-size grayscale frames from any byte stream (a file, a FIFO, or
//! the stdout of `ffmpeg -f rawvideo -pix_fmt gray`) and reports the mean
//! brightness of each frame. Frame buffers come from a small `FramePool`; a
//! `FrameGuard` hands its buffer back when dropped, on success and on every
//! error path alike.

use std::io::{ErrorKind, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use latency_traits::{BoxError, Probe};

use crate::error::{HwError, Result};

/// Reusable frame buffers of one fixed size.
#[derive(Debug, Clone)]
pub struct FramePool {
    frame_bytes: usize,
    free: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FramePool {
    pub fn new(frame_bytes: usize, prealloc: usize) -> Result<Self> {
        if frame_bytes == 0 {
            return Err(HwError::FrameSize(frame_bytes));
        }
        let free = (0..prealloc).map(|_| vec![0u8; frame_bytes]).collect();
        Ok(Self {
            frame_bytes,
            free: Arc::new(Mutex::new(free)),
        })
    }

    #[inline]
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Buffers currently parked in the pool.
    pub fn available(&self) -> usize {
        self.free.lock().map(|v| v.len()).unwrap_or(0)
    }

    /// Borrow a buffer, allocating when the pool is empty.
    pub fn acquire(&self) -> FrameGuard {
        let buf = self
            .free
            .lock()
            .ok()
            .and_then(|mut v| v.pop())
            .unwrap_or_else(|| vec![0u8; self.frame_bytes]);
        FrameGuard {
            buf: Some(buf),
            pool: self.free.clone(),
        }
    }
}

/// A borrowed frame buffer; returned to its pool on drop.
#[derive(Debug)]
pub struct FrameGuard {
    buf: Option<Vec<u8>>,
    pool: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FrameGuard {
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            if let Ok(mut free) = self.pool.lock() {
                free.push(buf);
            }
        }
    }
}

/// Mean byte value of a frame scaled to [0, 1]. An empty frame reads as dark.
pub fn mean_level(frame: &[u8]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: u64 = frame.iter().map(|&b| u64::from(b)).sum();
    sum as f64 / (frame.len() as f64 * 255.0)
}

/// Brightness probe over a raw frame stream.
pub struct RawFrameProbe<R: Read> {
    reader: R,
    pool: FramePool,
    closed: bool,
}

impl<R: Read> RawFrameProbe<R> {
    pub fn new(reader: R, frame_bytes: usize) -> Result<Self> {
        Ok(Self {
            reader,
            pool: FramePool::new(frame_bytes, 2)?,
            closed: false,
        })
    }

    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    /// Read one whole frame and return its mean level.
    pub fn read_frame(&mut self) -> Result<f64> {
        if self.closed {
            return Err(HwError::EndOfStream);
        }
        let mut frame = self.pool.acquire();
        let buf = frame.as_mut_slice();
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.closed = true;
                    return Err(if filled == 0 {
                        HwError::EndOfStream
                    } else {
                        HwError::ShortFrame {
                            expected: buf.len(),
                            got: filled,
                        }
                    });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(HwError::Timeout);
                }
                Err(e) => return Err(HwError::Io(e)),
            }
        }
        Ok(mean_level(frame.as_slice()))
    }
}

impl<R: Read> Probe for RawFrameProbe<R> {
    /// Blocking readers cannot honor `timeout`. Run this behind a
    /// `ThreadedSampler`: its drop stops waiting after the timeout plus a grace
    /// period and detaches a thread stuck here, and the runner warns once the
    /// stream has been silent for `runner.stall_warn_ms`.
    fn read(&mut self, _timeout: Duration) -> std::result::Result<f64, BoxError> {
        let level = self.read_frame()?;
        tracing::trace!(level, "raw frame");
        Ok(level)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
