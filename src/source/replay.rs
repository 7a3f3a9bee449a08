//! Replays recorded readings through the pipeline.

use crate::source::types::{SignalSource, SourceError};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

/// Spacing of scripted readings unless [`ReplaySource::with_interval`] says otherwise.
const DEFAULT_SPACING: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
struct Reading {
    at: DateTime<Utc>,
    value: Result<u8, SourceError>,
}

/// A source that yields a fixed script of timestamped readings, then `Exhausted`.
///
/// Readings carry the time they were recorded at, so events found during a
/// replay span the recording rather than the replay run.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    script: VecDeque<Reading>,
    /// Time of the reading most recently handed out
    current: Option<DateTime<Utc>>,
    label: String,
}

impl ReplaySource {
    /// Replay the given values in order.
    pub fn from_values(values: impl IntoIterator<Item = u8>) -> Self {
        Self::from_script(values.into_iter().map(Ok))
    }

    /// Replay a mix of readings and acquisition failures, one second apart
    /// starting now.
    pub fn from_script(script: impl IntoIterator<Item = Result<u8, SourceError>>) -> Self {
        let source = Self {
            script: script
                .into_iter()
                .map(|value| Reading {
                    at: Utc::now(),
                    value,
                })
                .collect(),
            current: None,
            label: "script".to_string(),
        };
        source.with_interval(DEFAULT_SPACING)
    }

    /// Re-space the readings `interval` apart, keeping the first one's time.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        let step =
            chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::zero());
        if let Some(origin) = self.script.front().map(|r| r.at) {
            let mut at = origin;
            for reading in self.script.iter_mut() {
                reading.at = at;
                at += step;
            }
        }
        self
    }

    /// Load the timestamp and signal columns of a sample log.
    ///
    /// Accepts the tracker's own sample log as well as any `timestamp,signal[,...]`
    /// file. Rows with an empty signal column were acquisition failures and
    /// replay as errors.
    pub fn from_sample_log(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SourceError::Command(format!("{}: {e}", path.display())))?;
        let mut source = Self::parse_log(&content)?;
        source.label = path.display().to_string();
        Ok(source)
    }

    fn parse_log(content: &str) -> Result<Self, SourceError> {
        let mut script = VecDeque::new();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("timestamp") {
                continue;
            }

            let mut fields = line.split(',').map(str::trim);
            let stamp = fields.next().unwrap_or_default();
            let signal = fields.next().ok_or_else(|| {
                SourceError::Parse(format!("line {}: missing signal column", line_no + 1))
            })?;
            let at = parse_timestamp(stamp).ok_or_else(|| {
                SourceError::Parse(format!("line {}: bad timestamp {stamp:?}", line_no + 1))
            })?;

            if signal.is_empty() {
                script.push_back(Reading {
                    at,
                    value: Err(SourceError::Parse(format!(
                        "line {}: recorded acquisition failure",
                        line_no + 1
                    ))),
                });
                continue;
            }

            let value: u32 = signal.parse().map_err(|_| {
                SourceError::Parse(format!("line {}: bad signal {signal:?}", line_no + 1))
            })?;
            script.push_back(Reading {
                at,
                value: Ok(value.min(100) as u8),
            });
        }

        Ok(Self {
            script,
            current: None,
            label: "log".to_string(),
        })
    }

    /// Readings left to replay.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

/// Log rows are written as naive UTC; RFC 3339 is accepted as well.
fn parse_timestamp(field: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(field, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(field)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

impl SignalSource for ReplaySource {
    fn read(&mut self) -> Result<u8, SourceError> {
        match self.script.pop_front() {
            Some(reading) => {
                self.current = Some(reading.at);
                reading.value
            }
            None => Err(SourceError::Exhausted),
        }
    }

    fn describe(&self) -> String {
        format!("replay of {} ({} readings)", self.label, self.script.len())
    }

    fn sample_time(&self) -> DateTime<Utc> {
        self.current.unwrap_or_else(Utc::now)
    }

    fn is_recorded(&self) -> bool {
        true
    }
}
