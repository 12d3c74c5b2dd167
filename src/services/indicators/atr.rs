//! Average True Range.

use crate::types::Candle;

/// ATR (Average True Range).
///
/// Wilder-smoothed true range; the volatility unit for the risk model
/// (stop distance is a multiple of ATR).
pub struct Atr {
    period: usize,
}

impl Default for Atr {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Atr {
    /// Bars required for one reading.
    pub fn min_periods(&self) -> usize {
        self.period + 1
    }

    /// Compute ATR at the latest bar. None if fewer than period + 1 bars.
    pub fn compute(&self, candles: &[Candle]) -> Option<f64> {
        if candles.len() < self.min_periods() {
            return None;
        }

        let tr: Vec<f64> = candles
            .windows(2)
            .map(|w| {
                let hl = w[1].high - w[1].low;
                let hc = (w[1].high - w[0].close).abs();
                let lc = (w[1].low - w[0].close).abs();
                hl.max(hc).max(lc)
            })
            .collect();

        let mut atr: f64 = tr.iter().take(self.period).sum::<f64>() / self.period as f64;
        for value in tr.iter().skip(self.period) {
            atr = (atr * (self.period - 1) as f64 + value) / self.period as f64;
        }

        Some(atr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::indicators::test_series::{flat, uptrend};

    #[test]
    fn test_atr_insufficient_data() {
        assert!(Atr::default().compute(&uptrend(10)).is_none());
    }

    #[test]
    fn test_atr_positive_for_moving_series() {
        let value = Atr::default().compute(&uptrend(50)).unwrap();
        assert!(value > 0.0, "ATR should be positive, got {}", value);
    }

    #[test]
    fn test_atr_zero_for_flat_series() {
        let value = Atr::default().compute(&flat(50, 100.0)).unwrap();
        assert_eq!(value, 0.0);
    }
}
