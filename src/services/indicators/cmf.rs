//! Chaikin Money Flow.

use crate::types::Candle;

/// CMF (Chaikin Money Flow).
///
/// Volume-weighted accumulation/distribution over the lookback window,
/// in -1..1. Positive readings indicate buying pressure.
pub struct Cmf {
    period: usize,
}

impl Default for Cmf {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl Cmf {
    /// Bars required for one reading.
    pub fn min_periods(&self) -> usize {
        self.period
    }

    /// Compute CMF at the latest bar. None with fewer than 20 bars.
    pub fn compute(&self, candles: &[Candle]) -> Option<f64> {
        if candles.len() < self.period {
            return None;
        }

        let window = &candles[candles.len() - self.period..];

        let mut mf_volume_sum = 0.0;
        let mut volume_sum = 0.0;

        for candle in window {
            let range = candle.high - candle.low;
            // Zero-range bars contribute volume but no money flow
            let multiplier = if range > 0.0 {
                ((candle.close - candle.low) - (candle.high - candle.close)) / range
            } else {
                0.0
            };
            mf_volume_sum += multiplier * candle.volume;
            volume_sum += candle.volume;
        }

        if volume_sum <= 0.0 {
            return None;
        }

        Some(mf_volume_sum / volume_sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::indicators::test_series::{downtrend, uptrend, zero_volume};

    #[test]
    fn test_cmf_insufficient_data() {
        assert!(Cmf::default().compute(&uptrend(10)).is_none());
    }

    #[test]
    fn test_cmf_positive_when_closing_high() {
        // Uptrend candles close near their highs
        let value = Cmf::default().compute(&uptrend(40)).unwrap();
        assert!(value > 0.0, "CMF should be positive, got {}", value);
    }

    #[test]
    fn test_cmf_negative_when_closing_low() {
        let value = Cmf::default().compute(&downtrend(40)).unwrap();
        assert!(value < 0.0, "CMF should be negative, got {}", value);
    }

    #[test]
    fn test_cmf_within_bounds() {
        let value = Cmf::default().compute(&uptrend(40)).unwrap();
        assert!((-1.0..=1.0).contains(&value));
    }

    #[test]
    fn test_cmf_no_volume_is_undefined() {
        assert!(Cmf::default().compute(&zero_volume(40)).is_none());
    }
}
