//! MACD (Moving Average Convergence Divergence).

use crate::types::Candle;

/// Computed MACD values at the latest bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD indicator.
///
/// - Line = EMA(12) - EMA(26)
/// - Signal = EMA(9) of the line
/// - Histogram = line - signal
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

impl Macd {
    /// Bars required for one reading.
    pub fn min_periods(&self) -> usize {
        self.slow_period + self.signal_period
    }

    /// EMA over a value series, seeded with the SMA of the first period.
    fn ema(values: &[f64], period: usize) -> Vec<f64> {
        if values.len() < period {
            return Vec::new();
        }

        let multiplier = 2.0 / (period as f64 + 1.0);
        let mut ema = Vec::with_capacity(values.len() - period + 1);

        let sma: f64 = values.iter().take(period).sum::<f64>() / period as f64;
        ema.push(sma);

        for value in values.iter().skip(period) {
            let prev = *ema.last().expect("seeded above");
            ema.push((value - prev) * multiplier + prev);
        }

        ema
    }

    /// Compute MACD at the latest bar. None with fewer than 35 bars.
    pub fn compute(&self, candles: &[Candle]) -> Option<MacdOutput> {
        if candles.len() < self.min_periods() {
            return None;
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let fast_ema = Self::ema(&closes, self.fast_period);
        let slow_ema = Self::ema(&closes, self.slow_period);
        if fast_ema.is_empty() || slow_ema.is_empty() {
            return None;
        }

        // Fast EMA starts earlier; align the tails
        let offset = self.slow_period - self.fast_period;
        let line: Vec<f64> = fast_ema
            .iter()
            .skip(offset)
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect();

        if line.len() < self.signal_period {
            return None;
        }

        let signal_line = Self::ema(&line, self.signal_period);
        let line_now = *line.last()?;
        let signal_now = *signal_line.last()?;

        Some(MacdOutput {
            line: line_now,
            signal: signal_now,
            histogram: line_now - signal_now,
        })
    }
}
