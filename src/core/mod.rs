//! Detection core.
//!
//! This module contains:
//! - Exponential smoothing of raw readings
//! - Short/long window statistics
//! - The hysteresis detector and its intensity bands
//! - Debouncing and aggregation of activity into events

pub mod conditioner;
pub mod detector;
pub mod events;
pub mod window;

// Re-export commonly used types
pub use conditioner::Ema;
pub use detector::{DetectorOutput, Hysteresis, MotionDetector};
pub use events::{AggregatorStep, EventAggregator, MotionEvent};
pub use window::{DualWindow, WindowStats};
