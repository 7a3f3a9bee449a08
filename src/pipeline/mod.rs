//! The real-time sampling pipeline.
//!
//! ```text
//!  source ──▶ EMA ──▶ windows ──▶ hysteresis ──▶ aggregator ──▶ fan-out
//!                                                                │
//!                          ┌──────────────┬──────────────────────┤
//!                          ▼              ▼                      ▼
//!                     sample log      event log             live display
//! ```
//!
//! A single sampling thread owns all detector state. Consumers run on their
//! own threads behind bounded queues (see [`fanout`]).

pub mod cancel;
pub mod fanout;
pub mod sampler;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use fanout::{Consumer, ConsumerError, ConsumerOverflow, Fanout, OverflowPolicy};
pub use sampler::{Sampler, TickOutcome};

use crate::config::{ConfigError, DetectorConfig};
use crate::core::MotionEvent;
use crate::source::SignalSource;
use crate::stats::SharedRunStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Emitted once per successful iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub timestamp: DateTime<Utc>,
    pub raw_value: u8,
    pub short_mean: f64,
    pub short_std: f64,
    /// Instantaneous detector state
    pub active: bool,
    /// Intensity band 0..=3
    pub level: u8,
    /// Debounced activity flag
    pub motion: bool,
}

/// Emitted instead of a sample when acquisition fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

/// Everything a consumer can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineRecord {
    Sample(SampleRecord),
    SourceFailure(ErrorRecord),
    Event(MotionEvent),
}

/// Sizing of the consumer queues.
#[derive(Debug, Clone, Copy)]
pub struct FanoutOptions {
    pub queue_capacity: usize,
    pub policy: OverflowPolicy,
}

impl Default for FanoutOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            policy: OverflowPolicy::DropOldest,
        }
    }
}

/// A running monitoring session on its own thread.
pub struct Pipeline {
    cancel: CancelHandle,
    handle: Option<JoinHandle<()>>,
    stats: SharedRunStats,
}

impl Pipeline {
    /// Validate the configuration and start sampling.
    ///
    /// Nothing is spawned if the configuration is invalid.
    pub fn spawn<S: SignalSource + 'static>(
        config: &DetectorConfig,
        source: S,
        consumers: Vec<Box<dyn Consumer>>,
        options: FanoutOptions,
        stats: SharedRunStats,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let fanout = Fanout::new(
            consumers,
            options.queue_capacity,
            options.policy,
            stats.clone(),
        );
        let sampler = Sampler::new(config, source, fanout, stats.clone())?;
        let interval = config.sample_interval();
        let (cancel, token) = cancel_pair();

        let handle = thread::spawn(move || run_loop(sampler, token, interval));

        Ok(Self {
            cancel,
            handle: Some(handle),
            stats,
        })
    }

    /// Handle that stops this pipeline, e.g. from a Ctrl+C handler.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn stats(&self) -> &SharedRunStats {
        &self.stats
    }

    /// Whether the sampling thread has exited (cancelled or source exhausted).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Request shutdown and wait for the sampler and consumers to finish.
    pub fn stop(mut self) {
        self.cancel.cancel();
        self.join();
    }

    /// Wait until the pipeline stops on its own or is cancelled elsewhere.
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("sampling thread panicked");
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.join();
    }
}

fn run_loop<S: SignalSource>(mut sampler: Sampler<S>, token: CancelToken, interval: Duration) {
    tracing::info!(source = %sampler.source().describe(), "sampling started");

    while !token.is_cancelled() {
        if sampler.tick() == TickOutcome::Exhausted {
            tracing::info!("signal source exhausted");
            break;
        }
        if token.sleep(interval) {
            break;
        }
    }

    tracing::info!("sampling stopped");
    sampler.finish();
}

/// Run detection over a finite source as fast as it yields, without sleeping.
///
/// Event spans and durations follow the source's recorded timestamps.
///
/// Consumers are never skipped: full queues make the replay wait.
pub fn run_replay<S: SignalSource>(
    config: &DetectorConfig,
    source: S,
    consumers: Vec<Box<dyn Consumer>>,
    queue_capacity: usize,
    stats: SharedRunStats,
) -> Result<(), ConfigError> {
    config.validate()?;

    let fanout = Fanout::new(
        consumers,
        queue_capacity,
        OverflowPolicy::Block,
        stats.clone(),
    );
    let mut sampler = Sampler::new(config, source, fanout, stats)?;

    while sampler.tick() != TickOutcome::Exhausted {}

    sampler.finish();
    Ok(())
}
