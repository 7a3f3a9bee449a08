//! Prints one status line per record to stdout.

use crate::pipeline::{Consumer, ConsumerError, PipelineRecord};
use crate::sinks::format_timestamp;

/// Console status output for foreground runs.
#[derive(Debug, Default)]
pub struct ConsolePrinter;

impl ConsolePrinter {
    /// Render a record as a single line.
    pub fn render(record: &PipelineRecord) -> String {
        match record {
            PipelineRecord::Sample(s) => format!(
                "{} signal={}% avg={:.2}% std={:.2} state={} level={}",
                format_timestamp(&s.timestamp),
                s.raw_value,
                s.short_mean,
                s.short_std,
                if s.motion { "MOTION" } else { "IDLE" },
                s.level
            ),
            PipelineRecord::SourceFailure(e) => {
                format!("{} source_error {}", format_timestamp(&e.timestamp), e.error)
            }
            PipelineRecord::Event(e) => format!(
                "{} event {:.1}s max_std={:.2} mean_signal={:.1}%",
                format_timestamp(&e.start),
                e.duration_secs,
                e.max_std,
                e.mean_signal
            ),
        }
    }
}

impl Consumer for ConsolePrinter {
    fn name(&self) -> &str {
        "console"
    }

    fn handle(&mut self, record: &PipelineRecord) -> Result<(), ConsumerError> {
        println!("{}", Self::render(record));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SampleRecord;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_sample_line() {
        let line = ConsolePrinter::render(&PipelineRecord::Sample(SampleRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            raw_value: 64,
            short_mean: 63.25,
            short_std: 9.5,
            active: true,
            level: 1,
            motion: true,
        }));
        assert_eq!(
            line,
            "2024-03-01T12:00:00.000000 signal=64% avg=63.25% std=9.50 state=MOTION level=1"
        );
    }
}
