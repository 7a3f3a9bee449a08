//! Exponential smoothing of raw readings.

/// Exponential moving average with a single persistent value.
///
/// The first observation seeds the average; later ones update it as
/// `ema = alpha * x + (1 - alpha) * ema`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    /// `alpha` must already be validated to lie in (0, 1].
    pub fn new(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    /// Fold a raw reading into the average and return the smoothed value.
    pub fn smooth(&mut self, raw: f64) -> f64 {
        let next = match self.value {
            None => raw,
            Some(prev) => self.alpha * raw + (1.0 - self.alpha) * prev,
        };
        self.value = Some(next);
        next
    }
}
