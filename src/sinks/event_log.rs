//! Per-event delimited-text log: `start,end,duration_s,max_std,mean_signal`.

use crate::core::MotionEvent;
use crate::pipeline::{Consumer, ConsumerError, PipelineRecord};
use crate::sinks::{format_timestamp, open_append};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const EVENT_LOG_HEADER: &str = "start,end,duration_s,max_std,mean_signal";

/// Appends one row per closed event.
pub struct EventLog<W: Write + Send + 'static> {
    out: BufWriter<W>,
}

impl EventLog<File> {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let (file, is_new) = open_append(path)?;
        Self::new(file, is_new)
    }
}

impl<W: Write + Send + 'static> EventLog<W> {
    pub fn new(writer: W, write_header: bool) -> std::io::Result<Self> {
        let mut out = BufWriter::new(writer);
        if write_header {
            writeln!(out, "{EVENT_LOG_HEADER}")?;
            out.flush()?;
        }
        Ok(Self { out })
    }

    pub fn get_ref(&self) -> &W {
        self.out.get_ref()
    }

    fn write_event(&mut self, event: &MotionEvent) -> std::io::Result<()> {
        writeln!(
            self.out,
            "{},{},{:.3},{:.3},{:.3}",
            format_timestamp(&event.start),
            format_timestamp(&event.end),
            event.duration_secs,
            event.max_std,
            event.mean_signal
        )?;
        self.out.flush()
    }
}

impl<W: Write + Send + 'static> Consumer for EventLog<W> {
    fn name(&self) -> &str {
        "event-log"
    }

    fn handle(&mut self, record: &PipelineRecord) -> Result<(), ConsumerError> {
        if let PipelineRecord::Event(event) = record {
            self.write_event(event)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ConsumerError> {
        self.out.flush()?;
        Ok(())
    }
}
