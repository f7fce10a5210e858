//! Background probe sampling.
//!
//! `ThreadedSampler` spawns a thread that owns a blocking `Probe`, timestamps
//! each reading right after the read returns, and pushes samples through a
//! bounded channel. The consumer side implements `Sampler` and never blocks.
//!
//! Each `ThreadedSampler` owns exactly one thread. Dropping the sampler asks it
//! to stop and waits at most the read timeout plus `JOIN_GRACE`; a thread still
//! stuck in a blocking read after that is detached and exits when the read
//! returns.
use crossbeam_channel as xch;
use latency_traits::clock::Clock;
use latency_traits::{BoxError, Probe, Sample, Sampler, Timestamp};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Default channel depth; a few frames of slack for a slow consumer.
pub const DEFAULT_QUEUE: usize = 8;

/// Extra wait on drop beyond the read timeout before the thread is detached.
pub const JOIN_GRACE: Duration = Duration::from_millis(100);

pub struct ThreadedSampler {
    rx: xch::Receiver<Sample>,
    last_ok: Arc<AtomicU64>,
    epoch: Timestamp,
    clock: Arc<dyn Clock + Send + Sync>,
    shutdown: Arc<AtomicBool>,
    timeout: Duration,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

#[inline]
fn level_in_range(level: f64) -> bool {
    level.is_finite() && (0.0..=1.0).contains(&level)
}

/// Queue a sample, waiting while the consumer is behind. Returns false when
/// the thread should exit (consumer gone or shutdown requested).
fn push(tx: &xch::Sender<Sample>, mut sample: Sample, shutdown: &AtomicBool) -> bool {
    loop {
        match tx.send_timeout(sample, Duration::from_millis(10)) {
            Ok(()) => return true,
            Err(xch::SendTimeoutError::Timeout(s)) => {
                if shutdown.load(Ordering::Relaxed) {
                    return false;
                }
                sample = s;
            }
            Err(xch::SendTimeoutError::Disconnected(_)) => {
                tracing::debug!("sampler consumer disconnected, exiting thread");
                return false;
            }
        }
    }
}

impl ThreadedSampler {
    /// Spawn the probe thread. `queue` is clamped to at least 1.
    pub fn spawn<P, C>(mut probe: P, timeout: Duration, clock: C, queue: usize) -> Self
    where
        P: Probe + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(queue.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(clock);
        let thread_clock = clock.clone();
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("probe thread received shutdown signal");
                    break;
                }

                match probe.read(timeout) {
                    Ok(level) if level_in_range(level) => {
                        let sample = Sample::new(thread_clock.now(), level);
                        last_ok_clone.store(thread_clock.ms_since(epoch), Ordering::Relaxed);
                        if !push(&tx, sample, &shutdown_clone) {
                            break;
                        }
                    }
                    Ok(level) => {
                        tracing::warn!(level, "probe level out of range; dropped");
                    }
                    Err(e) => {
                        if probe.is_closed() {
                            tracing::info!(error = %e, "probe stream closed");
                            break;
                        }
                        tracing::trace!(error = %e, "probe read failed");
                    }
                }
            }
            tracing::trace!("probe thread exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            epoch,
            clock,
            shutdown,
            timeout,
            join_handle: Some(join_handle),
        }
    }

    /// Milliseconds since the last successful read, relative to `now_ms` past the sampler epoch.
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// Stall time measured with the sampler's own clock.
    pub fn stalled_for_now(&self) -> u64 {
        self.stalled_for(self.clock.ms_since(self.epoch))
    }
}

impl Sampler for ThreadedSampler {
    fn poll(&mut self) -> Result<Option<Sample>, BoxError> {
        match self.rx.try_recv() {
            Ok(s) => Ok(Some(s)),
            Err(xch::TryRecvError::Empty) => Ok(None),
            Err(xch::TryRecvError::Disconnected) => {
                Err(Box::new(std::io::Error::other("probe thread stopped")))
            }
        }
    }

    /// Exhausted once the probe thread has ended and every queued sample was consumed.
    fn is_exhausted(&self) -> bool {
        self.rx.is_empty()
            && self
                .join_handle
                .as_ref()
                .is_none_or(|h| h.is_finished())
    }

    fn stalled(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.stalled_for_now()))
    }
}

impl Drop for ThreadedSampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let Some(handle) = self.join_handle.take() else {
            return;
        };
        let deadline = std::time::Instant::now() + self.timeout.saturating_add(JOIN_GRACE);
        while !handle.is_finished() {
            if std::time::Instant::now() >= deadline {
                tracing::warn!(
                    wait_ms = self.timeout.saturating_add(JOIN_GRACE).as_millis() as u64,
                    "probe thread still blocked in read; detaching"
                );
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        match handle.join() {
            Ok(()) => tracing::trace!("probe thread joined"),
            Err(e) => tracing::warn!(?e, "probe thread panicked during shutdown"),
        }
    }
}
