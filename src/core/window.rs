//! Dual-window statistics over the smoothed signal.
//!
//! The short window tracks recent burstiness through its standard deviation.
//! The long window supplies a slowly adapting baseline using the median and
//! the median absolute deviation (MAD), which occasional spikes barely move.

use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Samples required before the short window produces statistics.
pub const SHORT_MIN_SAMPLES: usize = 5;

/// Samples required before the long-window baseline is used.
pub const LONG_MIN_SAMPLES: usize = 10;

/// Scale factor turning a MAD into a normal-consistent standard deviation.
pub const MAD_SCALE: f64 = 1.4826;

/// Values at or below this are treated as zero dispersion.
const EPSILON: f64 = 1e-9;

/// Statistics produced for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowStats {
    /// Short window holds at least [`SHORT_MIN_SAMPLES`] values
    pub ready: bool,
    /// Mean of the short window
    pub short_mean: f64,
    /// Population standard deviation of the short window
    pub short_std: f64,
    /// Long window holds at least [`LONG_MIN_SAMPLES`] values
    pub long_ready: bool,
    /// |x - median| / (MAD * 1.4826) against the long window, 0 if degenerate
    pub robust_z: f64,
}

/// Two bounded FIFO windows fed with the same smoothed values.
#[derive(Debug, Clone, PartialEq)]
pub struct DualWindow {
    short: VecDeque<f64>,
    long: VecDeque<f64>,
    short_capacity: usize,
    long_capacity: usize,
}

impl DualWindow {
    pub fn new(short_capacity: usize, long_capacity: usize) -> Self {
        Self {
            short: VecDeque::with_capacity(short_capacity),
            long: VecDeque::with_capacity(long_capacity),
            short_capacity,
            long_capacity,
        }
    }

    /// Append a smoothed value to both windows and compute statistics.
    pub fn observe(&mut self, value: f64) -> WindowStats {
        push_bounded(&mut self.short, self.short_capacity, value);
        push_bounded(&mut self.long, self.long_capacity, value);

        if self.short.len() < SHORT_MIN_SAMPLES {
            return WindowStats::default();
        }

        let short_mean = self.short.iter().mean();
        let short_std = self.short.iter().population_std_dev();

        let long_ready = self.long.len() >= LONG_MIN_SAMPLES;
        let robust_z = if long_ready {
            self.robust_z(value)
        } else {
            0.0
        };

        WindowStats {
            ready: true,
            short_mean,
            short_std,
            long_ready,
            robust_z,
        }
    }

    fn robust_z(&self, value: f64) -> f64 {
        let values: Vec<f64> = self.long.iter().copied().collect();
        let med = median(&values);
        let deviations: Vec<f64> = values.iter().map(|x| (x - med).abs()).collect();
        let mad = median(&deviations);

        let scale = if mad > EPSILON { mad * MAD_SCALE } else { 0.0 };
        if scale > EPSILON {
            (value - med).abs() / scale
        } else {
            0.0
        }
    }

    pub fn short_len(&self) -> usize {
        self.short.len()
    }

    pub fn long_len(&self) -> usize {
        self.long.len()
    }
}

fn push_bounded(window: &mut VecDeque<f64>, capacity: usize, value: f64) {
    if window.len() == capacity {
        window.pop_front();
    }
    window.push_back(value);
}

/// Median of a non-empty slice; even lengths average the two middle values.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
