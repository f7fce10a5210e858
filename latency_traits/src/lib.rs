pub mod clock;
pub mod time;

pub use clock::{Clock, MonotonicClock};
pub use time::Timestamp;

/// Error type used at collaborator boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One brightness observation: when it was captured and how bright it was (0 = dark, 1 = light).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub level: f64,
}

impl Sample {
    #[inline]
    pub fn new(timestamp: Timestamp, level: f64) -> Self {
        Self { timestamp, level }
    }
}

/// Solid color the screen is commanded to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayColor {
    Dark,
    Light,
}

impl DisplayColor {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            DisplayColor::Dark => DisplayColor::Light,
            DisplayColor::Light => DisplayColor::Dark,
        }
    }

    #[inline]
    pub fn is_dark(self) -> bool {
        matches!(self, DisplayColor::Dark)
    }
}

/// Non-blocking source of brightness samples.
pub trait Sampler {
    /// Return the next sample if one is ready, `Ok(None)` otherwise.
    /// Timestamps of successive samples must not decrease.
    fn poll(&mut self) -> Result<Option<Sample>, BoxError>;

    /// True once a finite source has nothing left to deliver.
    fn is_exhausted(&self) -> bool {
        false
    }

    /// How long the source has gone without delivering a reading, when it tracks that.
    fn stalled(&self) -> Option<std::time::Duration> {
        None
    }
}

/// Blocking brightness probe (camera frame averager, photodiode, ...).
pub trait Probe {
    /// Block until one reading is available or `timeout` expires.
    fn read(&mut self, timeout: std::time::Duration) -> Result<f64, BoxError>;

    /// True once the underlying stream has ended and no read can succeed again.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Output surface that can be filled with a solid color.
pub trait Screen {
    fn set_color(&mut self, color: DisplayColor) -> Result<(), BoxError>;
}

impl<S: Sampler + ?Sized> Sampler for Box<S> {
    fn poll(&mut self) -> Result<Option<Sample>, BoxError> {
        (**self).poll()
    }
    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
    fn stalled(&self) -> Option<std::time::Duration> {
        (**self).stalled()
    }
}

impl<S: Screen + ?Sized> Screen for Box<S> {
    fn set_color(&mut self, color: DisplayColor) -> Result<(), BoxError> {
        (**self).set_color(color)
    }
}

impl<S: Sampler + ?Sized> Sampler for &mut S {
    fn poll(&mut self) -> Result<Option<Sample>, BoxError> {
        (**self).poll()
    }
    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
    fn stalled(&self) -> Option<std::time::Duration> {
        (**self).stalled()
    }
}

impl<S: Screen + ?Sized> Screen for &mut S {
    fn set_color(&mut self, color: DisplayColor) -> Result<(), BoxError> {
        (**self).set_color(color)
    }
}
