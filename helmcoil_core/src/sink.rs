//! Measurement log sinks.
//!
//! A sweep writes a header (start time and memo), one record per sample and a
//! footer (end time). `CsvLogSink` produces the bench's CSV layout:
//!
//! ```text
//! start_time,2024-05-01_13-45-10
//! memo,coil B after rewind
//! #####
//! elapsed_s,set_current_a,measured_current_a,field,measured_voltage_v,fine
//! 0.412,0.5,0.504,10.48,1.008,0
//! ...
//! end_time,2024-05-01_13-52-41
//! ```

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::{ControlError, Result};
use crate::status::StatusSample;

/// Timestamp layout used in sink headers and default file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub const COLUMNS: [&str; 6] = [
    "elapsed_s",
    "set_current_a",
    "measured_current_a",
    "field",
    "measured_voltage_v",
    "fine",
];

/// Destination for sweep samples.
pub trait LogSink {
    fn begin(&mut self, start: DateTime<Local>, memo: &str) -> Result<()>;
    fn record(&mut self, sample: &StatusSample) -> Result<()>;
    fn finish(&mut self, end: DateTime<Local>) -> Result<()>;
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn begin(&mut self, start: DateTime<Local>, memo: &str) -> Result<()> {
        (**self).begin(start, memo)
    }

    fn record(&mut self, sample: &StatusSample) -> Result<()> {
        (**self).record(sample)
    }

    fn finish(&mut self, end: DateTime<Local>) -> Result<()> {
        (**self).finish(end)
    }
}

fn sink_err(e: impl core::fmt::Display) -> eyre::Report {
    eyre::Report::new(ControlError::Sink(e.to_string()))
}

/// CSV sink. Every record is flushed so a crashed run keeps its samples.
pub struct CsvLogSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvLogSink<File> {
    /// Open `path` for appending, creating it if needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(sink_err)?;
        tracing::info!(path = %path.display(), "log sink opened");
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> CsvLogSink<W> {
    pub fn from_writer(w: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(w);
        Self { writer }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| sink_err(e.error()))
    }

    fn row<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer.write_record(fields).map_err(sink_err)?;
        self.writer.flush().map_err(sink_err)
    }
}

impl<W: Write> LogSink for CsvLogSink<W> {
    fn begin(&mut self, start: DateTime<Local>, memo: &str) -> Result<()> {
        let ts = start.format(TIMESTAMP_FORMAT).to_string();
        self.row(["start_time", ts.as_str()])?;
        self.row(["memo", memo])?;
        self.row(["#####"])?;
        self.row(COLUMNS)
    }

    fn record(&mut self, s: &StatusSample) -> Result<()> {
        self.row([
            s.elapsed_s.to_string(),
            s.set_current_a.to_string(),
            s.measured_current_a.to_string(),
            s.measured_field.to_string(),
            s.measured_voltage_v.to_string(),
            s.fine.to_string(),
        ])
    }

    fn finish(&mut self, end: DateTime<Local>) -> Result<()> {
        let ts = end.format(TIMESTAMP_FORMAT).to_string();
        self.row(["end_time", ts.as_str()])
    }
}
