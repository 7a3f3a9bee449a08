//! WiFi Motion Tracker - motion detection from wireless link quality.
//!
//! People moving near a wireless link make its reported signal quality
//! fluctuate. This library turns that noisy, periodically sampled percentage
//! into an activity flag, an intensity level and a stream of debounced
//! motion events.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Sampling thread                           │
//! │  ┌────────┐   ┌─────┐   ┌─────────────┐   ┌────────────┐         │
//! │  │ Source │──▶│ EMA │──▶│ Short/long  │──▶│ Hysteresis │──┐      │
//! │  └────────┘   └─────┘   │  windows    │   └────────────┘  │      │
//! │                         └─────────────┘                   ▼      │
//! │                                                  ┌──────────────┐│
//! │                                                  │  Aggregator  ││
//! │                                                  └──────┬───────┘│
//! └─────────────────────────────────────────────────────────┼────────┘
//!                          bounded queues (drop oldest)     ▼
//!                  ┌──────────────┬──────────────┬──────────────┐
//!                  │  Sample log  │  Event log   │ Live history │
//!                  └──────────────┴──────────────┴──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wifi_motion_tracker::{
//!     pipeline::{FanoutOptions, Pipeline},
//!     sinks::LiveHistory,
//!     source, DetectorConfig, RunStats,
//! };
//!
//! let (live, view) = LiveHistory::new(100);
//! let pipeline = Pipeline::spawn(
//!     &DetectorConfig::default(),
//!     source::default_source(None),
//!     vec![Box::new(live)],
//!     FanoutOptions::default(),
//!     Arc::new(RunStats::new()),
//! )
//! .expect("valid configuration");
//!
//! std::thread::sleep(std::time::Duration::from_secs(5));
//! println!("in motion: {}", view.snapshot().in_motion());
//! pipeline.stop();
//! ```

pub mod config;
pub mod core;
pub mod pipeline;
pub mod sinks;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use crate::config::{Config, ConfigError, DetectorConfig};
pub use crate::core::{DetectorOutput, EventAggregator, MotionDetector, MotionEvent};
pub use crate::pipeline::{Pipeline, PipelineRecord, SampleRecord};
pub use crate::source::{RawSample, SignalSource, SourceError};
pub use crate::stats::{RunStats, SharedRunStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
