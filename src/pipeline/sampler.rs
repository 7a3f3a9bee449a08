//! One iteration of the sampling loop.

use crate::config::{ConfigError, DetectorConfig};
use crate::core::{EventAggregator, MotionDetector};
use crate::pipeline::fanout::Fanout;
use crate::pipeline::{ErrorRecord, PipelineRecord, SampleRecord};
use crate::source::{RawSample, SignalSource, SourceError};
use crate::stats::SharedRunStats;
use chrono::{DateTime, Utc};
use std::time::Instant;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Sampled(SampleRecord),
    SourceFailed(ErrorRecord),
    /// The source has no more data and never will
    Exhausted,
}

/// Owns the source, detector state and event aggregator of one session.
///
/// Only the thread driving [`Sampler::tick`] ever touches the detector or
/// the aggregator.
pub struct Sampler<S: SignalSource> {
    source: S,
    detector: MotionDetector,
    aggregator: EventAggregator,
    fanout: Fanout,
    stats: SharedRunStats,
    /// First recorded timestamp and the instant it was replayed at
    recorded_origin: Option<(DateTime<Utc>, Instant)>,
}

impl<S: SignalSource> Sampler<S> {
    pub fn new(
        config: &DetectorConfig,
        source: S,
        fanout: Fanout,
        stats: SharedRunStats,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            detector: MotionDetector::new(config)?,
            aggregator: EventAggregator::new(config.min_samples()),
            source,
            fanout,
            stats,
            recorded_origin: None,
        })
    }

    /// Acquire one reading and push it through detection and fan-out.
    ///
    /// A failed acquisition leaves the detector and aggregator untouched and
    /// publishes a single error record.
    pub fn tick(&mut self) -> TickOutcome {
        let read = self.source.read();
        let timestamp = self.source.sample_time();

        let value = match read {
            Ok(value) => value,
            Err(SourceError::Exhausted) => return TickOutcome::Exhausted,
            Err(e) => {
                tracing::warn!("source error: {e}");
                self.stats.record_source_error();
                let record = ErrorRecord {
                    timestamp,
                    error: e.to_string(),
                };
                self.publish(PipelineRecord::SourceFailure(record.clone()));
                return TickOutcome::SourceFailed(record);
            }
        };

        let wall = self.wall_clock(timestamp);
        let sample = RawSample::new(value, timestamp);
        let output = self.detector.update(f64::from(sample.value));
        let step = self.aggregator.step(&sample, &output, wall);

        let record = SampleRecord {
            timestamp,
            raw_value: sample.value,
            short_mean: output.short_mean,
            short_std: output.short_std,
            active: output.active,
            level: output.level,
            motion: step.motion,
        };
        self.stats.record_sample();
        self.publish(PipelineRecord::Sample(record.clone()));

        if let Some(event) = step.closed {
            tracing::info!(
                start = %event.start,
                duration_secs = event.duration_secs,
                "motion event closed"
            );
            self.stats.record_event();
            self.publish(PipelineRecord::Event(event));
        }

        TickOutcome::Sampled(record)
    }

    fn publish(&self, record: PipelineRecord) {
        for overflow in self.fanout.publish(&record) {
            tracing::debug!("{overflow}");
        }
    }

    /// Monotonic time of a reading. Recorded sources are measured on their
    /// own timestamps, anchored at the first reading.
    fn wall_clock(&mut self, timestamp: DateTime<Utc>) -> Instant {
        if !self.source.is_recorded() {
            return Instant::now();
        }
        let (origin, anchor) = *self
            .recorded_origin
            .get_or_insert_with(|| (timestamp, Instant::now()));
        let offset = (timestamp - origin).to_std().unwrap_or_default();
        anchor.checked_add(offset).unwrap_or(anchor)
    }

    /// Close any open event and drain the consumers.
    ///
    /// A live event ends now; a replayed one ends at the last recorded reading.
    pub fn finish(mut self) {
        let end = self.source.sample_time();
        let wall = self.wall_clock(end);
        if let Some(event) = self.aggregator.flush(end, wall) {
            tracing::info!(start = %event.start, "closing motion event at shutdown");
            self.stats.record_event();
            self.publish(PipelineRecord::Event(event));
        }
        self.fanout.close();
    }

    pub fn detector(&self) -> &MotionDetector {
        &self.detector
    }

    pub fn aggregator(&self) -> &EventAggregator {
        &self.aggregator
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fanout::OverflowPolicy;
    use crate::source::ReplaySource;
    use crate::stats::RunStats;
    use std::sync::Arc;

    fn build(script: Vec<Result<u8, SourceError>>) -> Sampler<ReplaySource> {
        let stats = Arc::new(RunStats::new());
        let fanout = Fanout::new(Vec::new(), 8, OverflowPolicy::DropOldest, stats.clone());
        let config = DetectorConfig {
            window_size: 5,
            long_window: 20,
            ema_alpha: 1.0,
            min_duration_secs: 0.0,
            sample_interval_secs: 1.0,
            ..DetectorConfig::default()
        };
        Sampler::new(&config, ReplaySource::from_script(script), fanout, stats).unwrap()
    }

    #[test]
    fn test_failed_read_leaves_state_untouched() {
        let mut script: Vec<Result<u8, SourceError>> =
            [50, 52, 48, 51, 49, 90].into_iter().map(Ok).collect();
        script.push(Err(SourceError::NotConnected));
        script.push(Ok(90));
        let mut sampler = build(script);

        for _ in 0..6 {
            assert!(matches!(sampler.tick(), TickOutcome::Sampled(_)));
        }
        let detector_before = sampler.detector().clone();
        let aggregator_before = sampler.aggregator().clone();

        match sampler.tick() {
            TickOutcome::SourceFailed(record) => assert!(record.error.contains("disconnected")),
            other => panic!("expected a failure, got {other:?}"),
        }
        assert_eq!(sampler.detector(), &detector_before);
        assert_eq!(sampler.aggregator(), &aggregator_before);
        assert_eq!(sampler.stats.snapshot().source_errors, 1);

        assert!(matches!(sampler.tick(), TickOutcome::Sampled(_)));
        assert_eq!(sampler.tick(), TickOutcome::Exhausted);
    }

    #[test]
    fn test_records_carry_recorded_timestamps() {
        let script = vec![Ok(50), Err(SourceError::NotConnected), Ok(50)];
        let mut sampler = build(script);

        let first = match sampler.tick() {
            TickOutcome::Sampled(record) => record.timestamp,
            other => panic!("expected a sample, got {other:?}"),
        };
        match sampler.tick() {
            TickOutcome::SourceFailed(record) => {
                assert_eq!(record.timestamp - first, chrono::Duration::seconds(1))
            }
            other => panic!("expected a failure, got {other:?}"),
        }
        match sampler.tick() {
            TickOutcome::Sampled(record) => {
                assert_eq!(record.timestamp - first, chrono::Duration::seconds(2))
            }
            other => panic!("expected a sample, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let stats = Arc::new(RunStats::new());
        let fanout = Fanout::new(Vec::new(), 8, OverflowPolicy::DropOldest, stats.clone());
        let config = DetectorConfig {
            window_size: 0,
            ..DetectorConfig::default()
        };
        assert!(Sampler::new(&config, ReplaySource::default(), fanout, stats).is_err());
    }
}
