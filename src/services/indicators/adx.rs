//! Average Directional Index.

use crate::types::Candle;

/// Computed ADX values at the latest bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdxOutput {
    /// Trend strength irrespective of direction, >= 0.
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// ADX (Average Directional Index).
///
/// Measures trend strength, not direction. Readings above 25 mark a
/// tradeable trend; below that the market is considered ranging.
pub struct Adx {
    period: usize,
}

impl Default for Adx {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Adx {
    /// Bars required for one reading (DM smoothing plus DX smoothing).
    pub fn min_periods(&self) -> usize {
        self.period * 2 + 1
    }

    fn true_range(current: &Candle, previous: &Candle) -> f64 {
        let hl = current.high - current.low;
        let hc = (current.high - previous.close).abs();
        let lc = (current.low - previous.close).abs();
        hl.max(hc).max(lc)
    }

    /// Wilder's smoothed moving average.
    fn wilders_smooth(values: &[f64], period: usize) -> Vec<f64> {
        if values.len() < period {
            return Vec::new();
        }

        let mut result = Vec::with_capacity(values.len() - period + 1);
        let initial: f64 = values.iter().take(period).sum::<f64>() / period as f64;
        result.push(initial);

        for value in values.iter().skip(period) {
            let prev = *result.last().expect("seeded above");
            result.push((prev * (period - 1) as f64 + value) / period as f64);
        }

        result
    }

    /// Compute ADX at the latest bar. None with fewer than 29 bars.
    pub fn compute(&self, candles: &[Candle]) -> Option<AdxOutput> {
        if candles.len() < self.min_periods() {
            return None;
        }

        let mut plus_dm = Vec::with_capacity(candles.len() - 1);
        let mut minus_dm = Vec::with_capacity(candles.len() - 1);
        let mut tr = Vec::with_capacity(candles.len() - 1);

        for w in candles.windows(2) {
            let (previous, current) = (&w[0], &w[1]);

            let up_move = current.high - previous.high;
            let down_move = previous.low - current.low;

            plus_dm.push(if up_move > down_move && up_move > 0.0 {
                up_move
            } else {
                0.0
            });
            minus_dm.push(if down_move > up_move && down_move > 0.0 {
                down_move
            } else {
                0.0
            });
            tr.push(Self::true_range(current, previous));
        }

        let smoothed_plus_dm = Self::wilders_smooth(&plus_dm, self.period);
        let smoothed_minus_dm = Self::wilders_smooth(&minus_dm, self.period);
        let smoothed_tr = Self::wilders_smooth(&tr, self.period);
        if smoothed_tr.is_empty() {
            return None;
        }

        let mut dx_values = Vec::with_capacity(smoothed_tr.len());
        for i in 0..smoothed_tr.len() {
            let atr = smoothed_tr[i];
            if atr == 0.0 {
                dx_values.push(0.0);
                continue;
            }

            let plus_di = (smoothed_plus_dm[i] / atr) * 100.0;
            let minus_di = (smoothed_minus_dm[i] / atr) * 100.0;

            let di_sum = plus_di + minus_di;
            dx_values.push(if di_sum > 0.0 {
                ((plus_di - minus_di).abs() / di_sum) * 100.0
            } else {
                0.0
            });
        }

        let adx_values = Self::wilders_smooth(&dx_values, self.period);
        let adx = *adx_values.last()?;

        let last_atr = *smoothed_tr.last()?;
        let (plus_di, minus_di) = if last_atr > 0.0 {
            (
                (smoothed_plus_dm.last().copied().unwrap_or(0.0) / last_atr) * 100.0,
                (smoothed_minus_dm.last().copied().unwrap_or(0.0) / last_atr) * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        Some(AdxOutput {
            adx,
            plus_di,
            minus_di,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::indicators::test_series::{flat, uptrend};

    #[test]
    fn test_adx_min_periods() {
        assert_eq!(Adx::default().min_periods(), 29);
    }

    #[test]
    fn test_adx_insufficient_data() {
        assert!(Adx::default().compute(&uptrend(20)).is_none());
    }

    #[test]
    fn test_adx_non_negative() {
        let out = Adx::default().compute(&uptrend(50)).unwrap();
        assert!(out.adx >= 0.0, "ADX should be >= 0, got {}", out.adx);
    }

    #[test]
    fn test_adx_strong_in_sustained_trend() {
        let out = Adx::default().compute(&uptrend(80)).unwrap();
        assert!(
            out.adx > 25.0,
            "sustained uptrend should read as trending, got {}",
            out.adx
        );
        assert!(out.plus_di > out.minus_di);
    }

    #[test]
    fn test_adx_flat_series_reads_zero() {
        let out = Adx::default().compute(&flat(50, 100.0)).unwrap();
        assert_eq!(out.adx, 0.0);
    }
}
