//! Relative Strength Index.

use crate::types::Candle;

/// RSI (Relative Strength Index).
///
/// Momentum oscillator in 0-100 using Wilder smoothing of average
/// gains/losses. Readings below 40 feed the long score, above 60 the
/// short score.
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// Bars required for one reading.
    pub fn min_periods(&self) -> usize {
        self.period + 1
    }

    /// Compute RSI at the latest bar. None if fewer than period + 1 bars.
    pub fn compute(&self, candles: &[Candle]) -> Option<f64> {
        if candles.len() < self.min_periods() {
            return None;
        }

        let mut gains = Vec::with_capacity(candles.len() - 1);
        let mut losses = Vec::with_capacity(candles.len() - 1);

        for w in candles.windows(2) {
            let change = w[1].close - w[0].close;
            if change > 0.0 {
                gains.push(change);
                losses.push(0.0);
            } else {
                gains.push(0.0);
                losses.push(-change);
            }
        }

        let mut avg_gain: f64 = gains.iter().take(self.period).sum::<f64>() / self.period as f64;
        let mut avg_loss: f64 = losses.iter().take(self.period).sum::<f64>() / self.period as f64;

        // Wilder smoothing over the remaining changes
        for i in self.period..gains.len() {
            avg_gain = (avg_gain * (self.period - 1) as f64 + gains[i]) / self.period as f64;
            avg_loss = (avg_loss * (self.period - 1) as f64 + losses[i]) / self.period as f64;
        }

        if avg_loss == 0.0 {
            return Some(100.0);
        }

        let rs = avg_gain / avg_loss;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }
}
