//! Debouncing and aggregation of detector activity into events.
//!
//! The detector's per-sample flag flickers. An event only opens after
//! `min_samples` consecutive active samples. Its reported span runs from the
//! first sample of that active streak so the true onset is not lost, while
//! its statistics start at the sample that opened it. The event closes on
//! the first inactive sample.

use crate::core::detector::DetectorOutput;
use crate::source::RawSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A closed period of sustained activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    /// Timestamp of the first active sample of the streak
    pub start: DateTime<Utc>,
    /// Timestamp of the sample that ended the streak
    pub end: DateTime<Utc>,
    /// Elapsed wall-clock time between start and end
    pub duration_secs: f64,
    /// Largest short-window deviation seen while the event was open
    pub max_std: f64,
    /// Mean raw signal over the samples seen while the event was open
    pub mean_signal: f64,
}

/// Running totals for an event in progress.
#[derive(Debug, Clone, PartialEq)]
struct Accumulator {
    start: DateTime<Utc>,
    start_wall: Instant,
    max_std: f64,
    signal_sum: f64,
    sample_count: u32,
}

/// First sample of an active streak that has not been debounced yet.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Onset {
    start: DateTime<Utc>,
    start_wall: Instant,
}

impl Accumulator {
    /// Open an event that began at `onset`, seeded with the opening sample.
    fn seed(onset: Onset, sample: &RawSample, output: &DetectorOutput) -> Self {
        Self {
            start: onset.start,
            start_wall: onset.start_wall,
            max_std: output.short_std,
            signal_sum: f64::from(sample.value),
            sample_count: 1,
        }
    }

    fn add(&mut self, sample: &RawSample, output: &DetectorOutput) {
        self.max_std = self.max_std.max(output.short_std);
        self.signal_sum += f64::from(sample.value);
        self.sample_count += 1;
    }

    fn close(self, end: DateTime<Utc>, wall: Instant) -> MotionEvent {
        MotionEvent {
            start: self.start,
            end,
            duration_secs: wall.saturating_duration_since(self.start_wall).as_secs_f64(),
            max_std: self.max_std,
            mean_signal: self.signal_sum / f64::from(self.sample_count),
        }
    }
}

/// Result of feeding one sample to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorStep {
    /// Debounced activity flag after this sample
    pub motion: bool,
    /// Event closed by this sample, if any
    pub closed: Option<MotionEvent>,
}

/// Debounces detector output and builds [`MotionEvent`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct EventAggregator {
    min_samples: u32,
    consecutive_active: u32,
    /// Active streak that has not reached `min_samples` yet
    pending: Option<Onset>,
    /// Present exactly while the debounced flag is set
    open: Option<Accumulator>,
}

impl EventAggregator {
    pub fn new(min_samples: u32) -> Self {
        Self {
            min_samples: min_samples.max(1),
            consecutive_active: 0,
            pending: None,
            open: None,
        }
    }

    /// Feed one processed sample.
    pub fn step(
        &mut self,
        sample: &RawSample,
        output: &DetectorOutput,
        wall: Instant,
    ) -> AggregatorStep {
        if !output.active {
            self.consecutive_active = 0;
            self.pending = None;
            let closed = self
                .open
                .take()
                .map(|acc| acc.close(sample.timestamp, wall));
            return AggregatorStep {
                motion: false,
                closed,
            };
        }

        self.consecutive_active = self.consecutive_active.saturating_add(1);

        if let Some(acc) = self.open.as_mut() {
            acc.add(sample, output);
        } else {
            let onset = *self.pending.get_or_insert(Onset {
                start: sample.timestamp,
                start_wall: wall,
            });
            if self.consecutive_active >= self.min_samples {
                self.pending = None;
                self.open = Some(Accumulator::seed(onset, sample, output));
            }
        }

        AggregatorStep {
            motion: self.open.is_some(),
            closed: None,
        }
    }

    /// Close any open event, e.g. when the pipeline stops.
    pub fn flush(&mut self, end: DateTime<Utc>, wall: Instant) -> Option<MotionEvent> {
        self.consecutive_active = 0;
        self.pending = None;
        self.open.take().map(|acc| acc.close(end, wall))
    }

    /// Whether the debounced flag is currently set.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Start of the open event, if any.
    pub fn open_since(&self) -> Option<DateTime<Utc>> {
        self.open.as_ref().map(|acc| acc.start)
    }

    pub fn min_samples(&self) -> u32 {
        self.min_samples
    }
}
