//! Bollinger Bands.

use crate::types::Candle;

/// Computed band values at the latest bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// %B: where the close sits relative to the bands.
    /// 0 at the lower band, 1 at the upper, 0.5 at the middle.
    pub percent_b: f64,
    /// Upper minus lower band.
    pub width: f64,
}

/// Bollinger Bands: SMA(20) +/- 2 standard deviations.
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

impl BollingerBands {
    /// Bars required for one reading.
    pub fn min_periods(&self) -> usize {
        self.period
    }

    fn std_dev(values: &[f64], mean: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let variance: f64 =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        variance.sqrt()
    }

    /// Compute the bands at the latest bar. None with fewer than 20 bars.
    pub fn compute(&self, candles: &[Candle]) -> Option<BollingerOutput> {
        if candles.len() < self.period {
            return None;
        }

        let closes: Vec<f64> = candles
            .iter()
            .rev()
            .take(self.period)
            .map(|c| c.close)
            .collect();

        let middle = closes.iter().sum::<f64>() / self.period as f64;
        let std_dev = Self::std_dev(&closes, middle);

        let upper = middle + self.std_dev_multiplier * std_dev;
        let lower = middle - self.std_dev_multiplier * std_dev;
        let width = upper - lower;

        let close = candles.last()?.close;
        let percent_b = if width > 0.0 {
            (close - lower) / width
        } else {
            // Flat series: close sits on the collapsed band
            0.5
        };

        Some(BollingerOutput {
            upper,
            middle,
            lower,
            percent_b,
            width,
        })
    }
}
