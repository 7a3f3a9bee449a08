//! Per-sample delimited-text log.
//!
//! Columns: `timestamp,signal,avg,std,motion`. Failed acquisitions are
//! written as `timestamp,,,,0` so the log keeps one row per tick.

use crate::pipeline::{Consumer, ConsumerError, PipelineRecord};
use crate::sinks::{format_timestamp, open_append};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const SAMPLE_LOG_HEADER: &str = "timestamp,signal,avg,std,motion";

/// Appends one row per tick.
pub struct SampleLog<W: Write + Send + 'static> {
    out: BufWriter<W>,
}

impl SampleLog<File> {
    /// Append to the file at `path`, writing the header if it is new.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let (file, is_new) = open_append(path)?;
        Self::new(file, is_new)
    }
}

impl<W: Write + Send + 'static> SampleLog<W> {
    pub fn new(writer: W, write_header: bool) -> std::io::Result<Self> {
        let mut out = BufWriter::new(writer);
        if write_header {
            writeln!(out, "{SAMPLE_LOG_HEADER}")?;
            out.flush()?;
        }
        Ok(Self { out })
    }

    pub fn get_ref(&self) -> &W {
        self.out.get_ref()
    }
}

impl<W: Write + Send + 'static> Consumer for SampleLog<W> {
    fn name(&self) -> &str {
        "sample-log"
    }

    fn handle(&mut self, record: &PipelineRecord) -> Result<(), ConsumerError> {
        match record {
            PipelineRecord::Sample(s) => writeln!(
                self.out,
                "{},{},{:.4},{:.4},{}",
                format_timestamp(&s.timestamp),
                s.raw_value,
                s.short_mean,
                s.short_std,
                u8::from(s.motion)
            )?,
            PipelineRecord::SourceFailure(e) => {
                writeln!(self.out, "{},,,,0", format_timestamp(&e.timestamp))?
            }
            PipelineRecord::Event(_) => return Ok(()),
        }
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ConsumerError> {
        self.out.flush()?;
        Ok(())
    }
}
