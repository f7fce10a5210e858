//! Scripted collaborators for tests and offline replay.

use std::collections::VecDeque;
use std::time::Duration;

use latency_traits::{BoxError, DisplayColor, Probe, Sample, Sampler, Screen};

/// Replays a fixed list of poll results. A `None` entry models an empty poll.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSampler {
    script: VecDeque<Option<Sample>>,
}

impl ScriptedSampler {
    pub fn new(script: Vec<Option<Sample>>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// Every entry is a sample; no empty polls.
    pub fn from_samples<I: IntoIterator<Item = Sample>>(samples: I) -> Self {
        Self {
            script: samples.into_iter().map(Some).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Sampler for ScriptedSampler {
    fn poll(&mut self) -> Result<Option<Sample>, BoxError> {
        Ok(self.script.pop_front().flatten())
    }

    fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

/// Screen that remembers every color it was asked to show.
#[derive(Debug, Clone, Default)]
pub struct RecordingScreen {
    pub calls: Vec<DisplayColor>,
}

impl Screen for RecordingScreen {
    fn set_color(&mut self, color: DisplayColor) -> Result<(), BoxError> {
        self.calls.push(color);
        Ok(())
    }
}

/// Probe returning a fixed level, or failing on every read when `level` is `None`.
#[derive(Debug, Clone, Copy)]
pub struct ConstProbe {
    pub level: Option<f64>,
    /// Simulated read latency.
    pub delay: Duration,
}

impl Probe for ConstProbe {
    fn read(&mut self, timeout: Duration) -> Result<f64, BoxError> {
        std::thread::sleep(self.delay.min(timeout));
        self.level
            .ok_or_else(|| Box::new(std::io::Error::other("probe offline")) as BoxError)
    }
}
