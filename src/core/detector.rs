//! Hysteresis detector turning window statistics into an activity state.
//!
//! Activity is entered when either the short-window deviation exceeds the
//! threshold or, once the long baseline is ready, the robust z-score exceeds
//! `dev_factor`. It is left only when the short-window deviation drops below
//! `threshold * down_ratio`, so the exit level sits strictly below the entry
//! level. The exit test ignores the slow long window so recovery is never
//! held up by a stale baseline.

use crate::config::{ConfigError, DetectorConfig};
use crate::core::conditioner::Ema;
use crate::core::window::{DualWindow, WindowStats};
use serde::{Deserialize, Serialize};

/// Snapshot produced for every sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectorOutput {
    /// Hysteresis state after this sample
    pub active: bool,
    /// Mean of the short window (0 during warm-up)
    pub short_mean: f64,
    /// Standard deviation of the short window (0 during warm-up)
    pub short_std: f64,
    /// Intensity band 0..=3, 0 whenever inactive
    pub level: u8,
}

/// Hysteresis memory and thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Hysteresis {
    threshold: f64,
    dev_factor: f64,
    down_ratio: f64,
    active: bool,
}

impl Hysteresis {
    pub fn new(threshold: f64, dev_factor: f64, down_ratio: f64) -> Self {
        Self {
            threshold,
            dev_factor,
            down_ratio,
            active: false,
        }
    }

    /// Apply one set of window statistics.
    ///
    /// Statistics that are not ready yet leave the state untouched and
    /// produce a neutral output.
    pub fn classify(&mut self, stats: &WindowStats) -> DetectorOutput {
        if !stats.ready {
            return DetectorOutput::default();
        }

        let std = stats.short_std;
        let trig = if stats.long_ready {
            stats.robust_z > self.dev_factor || std > self.threshold
        } else {
            std > self.threshold
        };

        if self.active {
            if std < self.threshold * self.down_ratio {
                self.active = false;
            }
        } else if trig {
            self.active = true;
        }

        DetectorOutput {
            active: self.active,
            short_mean: stats.short_mean,
            short_std: std,
            level: self.level(std),
        }
    }

    fn level(&self, std: f64) -> u8 {
        if !self.active {
            0
        } else if std < self.threshold * 2.0 {
            1
        } else if std < self.threshold * 4.0 {
            2
        } else {
            3
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Complete per-run detector state: smoothing, windows and hysteresis.
///
/// One instance belongs to exactly one sampling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionDetector {
    ema: Ema,
    windows: DualWindow,
    hysteresis: Hysteresis,
}

impl MotionDetector {
    /// Build detector state, rejecting invalid configuration.
    pub fn new(config: &DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ema: Ema::new(config.ema_alpha),
            windows: DualWindow::new(config.window_size, config.long_capacity()),
            hysteresis: Hysteresis::new(config.threshold, config.dev_factor, config.down_ratio),
        })
    }

    /// Process one raw reading.
    pub fn update(&mut self, raw: f64) -> DetectorOutput {
        let smoothed = self.ema.smooth(raw);
        let stats = self.windows.observe(smoothed);
        self.hysteresis.classify(&stats)
    }

    pub fn is_active(&self) -> bool {
        self.hysteresis.is_active()
    }

    pub fn windows(&self) -> &DualWindow {
        &self.windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(short_std: f64) -> WindowStats {
        WindowStats {
            ready: true,
            short_mean: 50.0,
            short_std,
            long_ready: false,
            robust_z: 0.0,
        }
    }

    fn raw_config() -> DetectorConfig {
        DetectorConfig {
            window_size: 5,
            long_window: 20,
            threshold: 8.0,
            ema_alpha: 1.0,
            dev_factor: 3.0,
            down_ratio: 0.6,
            min_duration_secs: 0.0,
            sample_interval_secs: 1.0,
        }
    }

    #[test]
    fn test_not_ready_is_neutral_and_keeps_state() {
        let mut h = Hysteresis::new(8.0, 3.0, 0.6);
        h.classify(&stats(20.0));
        assert!(h.is_active());

        let out = h.classify(&WindowStats::default());
        assert_eq!(out, DetectorOutput::default());
        assert!(h.is_active());
    }

    #[test]
    fn test_hysteresis_band() {
        let mut h = Hysteresis::new(8.0, 3.0, 0.6);
        assert!(!h.classify(&stats(7.9)).active);
        assert!(h.classify(&stats(8.1)).active);

        // between 4.8 and 8.0 never deactivates
        for std in [7.5, 6.0, 5.0, 4.8, 7.9] {
            assert!(h.classify(&stats(std)).active, "dropped at {std}");
        }

        assert!(!h.classify(&stats(4.79)).active);
        // and the band does not re-trigger
        assert!(!h.classify(&stats(7.0)).active);
    }

    #[test]
    fn test_robust_trigger_needs_long_window() {
        let mut h = Hysteresis::new(8.0, 3.0, 0.6);
        let mut s = stats(1.0);
        s.robust_z = 10.0;
        assert!(!h.classify(&s).active);

        s.long_ready = true;
        assert!(h.classify(&s).active);

        // decay looks at the short window only
        assert!(!h.classify(&s).active);
    }

    #[test]
    fn test_levels() {
        let mut h = Hysteresis::new(8.0, 3.0, 0.6);
        assert_eq!(h.classify(&stats(9.0)).level, 1);
        assert_eq!(h.classify(&stats(16.0)).level, 2);
        assert_eq!(h.classify(&stats(31.9)).level, 2);
        assert_eq!(h.classify(&stats(32.0)).level, 3);
        assert_eq!(h.classify(&stats(1.0)).level, 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = DetectorConfig {
            ema_alpha: 0.0,
            ..raw_config()
        };
        assert!(MotionDetector::new(&config).is_err());
    }

    #[test]
    fn test_steady_signal_never_flags() {
        let mut detector = MotionDetector::new(&DetectorConfig::default()).unwrap();
        for _ in 0..100 {
            let out = detector.update(64.0);
            assert!(!out.active);
            assert_eq!(out.short_std, 0.0);
        }
    }

    #[test]
    fn test_alternating_extremes_activate() {
        let mut detector = MotionDetector::new(&raw_config()).unwrap();
        let mut out = DetectorOutput::default();
        for i in 0..5 {
            out = detector.update(if i % 2 == 0 { 0.0 } else { 100.0 });
        }
        assert!(out.short_std > 0.0);
        assert!(out.active);
        // std of 0/100/0/100/0 is about 49, past four thresholds
        assert_eq!(out.level, 3);
    }

    #[test]
    fn test_step_scenario() {
        let mut detector = MotionDetector::new(&raw_config()).unwrap();
        let input = [
            50.0, 50.0, 50.0, 50.0, 50.0, 90.0, 90.0, 90.0, 90.0, 90.0, 50.0, 50.0, 50.0, 50.0,
            50.0,
        ];
        let outputs: Vec<DetectorOutput> = input.iter().map(|&x| detector.update(x)).collect();

        for out in &outputs[..5] {
            assert!(!out.active);
        }
        // the jump raises the deviation to 16
        assert!(outputs[5].active);
        assert!((outputs[5].short_std - 16.0).abs() < 1e-9);
        assert!(outputs[6..9].iter().all(|o| o.active));
        // window full of 90s: deviation 0, below 8 * 0.6
        assert!(!outputs[9].active);
        // drop back to 50 triggers again, settles once the window is all 50s
        assert!(outputs[10].active);
        assert!(!outputs[14].active);
        assert_eq!(outputs[14].short_std, 0.0);
    }

    #[test]
    fn test_windows_bounded_through_detector() {
        let config = DetectorConfig {
            window_size: 7,
            long_window: 10,
            ..raw_config()
        };
        let mut detector = MotionDetector::new(&config).unwrap();
        for i in 0..500 {
            detector.update(((i * 37) % 101) as f64);
            assert!(detector.windows().short_len() <= 7);
            assert!(detector.windows().long_len() <= 28);
        }
    }
}
