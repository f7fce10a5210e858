//! Per-sample records and statistics summary lines.
//!
//! Record format (one line per sample, space separated):
//!
//! ```text
//! <elapsed seconds, 9 decimals> <level, 3 decimals> <transition code>
//! ```
//!
//! where the code is `1` when the screen was committed to dark this cycle,
//! `-1` when committed to light, and `0` otherwise.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use latency_traits::DisplayColor;

use crate::stats::Stats;

/// One sample's log record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRecord {
    pub elapsed_s: f64,
    pub level: f64,
    pub code: i8,
}

/// Transition code for a committed flip (or its absence).
#[inline]
pub fn transition_code(committed: Option<DisplayColor>) -> i8 {
    match committed {
        Some(DisplayColor::Dark) => 1,
        Some(DisplayColor::Light) => -1,
        None => 0,
    }
}

impl fmt::Display for SampleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9} {:.3} {}", self.elapsed_s, self.level, self.code)
    }
}

/// Human-readable summary of a statistics snapshot.
pub struct StatsLine<'a>(pub &'a Stats);

impl fmt::Display for StatsLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        write!(
            f,
            "Net: ({:>5.2} < {:>5.2}±{:<4.2} < {:>5.2})ms L->D: ({:>5.2}±{:<4.2})ms; D->L: ({:>5.2}±{:<4.2})ms",
            s.min_abs,
            s.total.mean,
            s.total.stdev,
            s.max_abs,
            s.l2d.mean,
            s.l2d.stdev,
            s.d2l.mean,
            s.d2l.stdev,
        )
    }
}

/// Write-only destination for sample records.
pub trait RecordSink {
    fn record(&mut self, rec: &SampleRecord) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Line-per-record sink over any writer.
pub struct WriterSink<W: Write> {
    out: BufWriter<W>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
        }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> io::Result<W> {
        self.out.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> RecordSink for WriterSink<W> {
    fn record(&mut self, rec: &SampleRecord) -> io::Result<()> {
        writeln!(self.out, "{rec}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Create (truncating) a record file.
pub fn open_record_file(path: &Path) -> io::Result<WriterSink<File>> {
    Ok(WriterSink::new(File::create(path)?))
}

/// Sink that drops everything (no record target configured).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn record(&mut self, _rec: &SampleRecord) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory sink, mostly for tests and offline analysis.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub records: Vec<SampleRecord>,
}

impl RecordSink for MemorySink {
    fn record(&mut self, rec: &SampleRecord) -> io::Result<()> {
        self.records.push(*rec);
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn record(&mut self, rec: &SampleRecord) -> io::Result<()> {
        (**self).record(rec)
    }
    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}
