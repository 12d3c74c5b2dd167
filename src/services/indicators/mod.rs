//! Technical indicator engine.
//!
//! Pure functions from an ordered candle series to indicator values at the
//! latest bar. Nothing here carries state between cycles; every snapshot is
//! recomputed from scratch.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cmf;
pub mod macd;
pub mod rsi;

pub use adx::{Adx, AdxOutput};
pub use atr::Atr;
pub use bollinger::{BollingerBands, BollingerOutput};
pub use cmf::Cmf;
pub use macd::{Macd, MacdOutput};
pub use rsi::Rsi;

use crate::error::ScanError;
use crate::types::{series_ordering_violation, Candle};

/// Minimum bars for a full snapshot: 26-period MACD plus 9-period signal
/// smoothing dominates every other indicator's requirement.
pub const MIN_LOOKBACK: usize = 35;

/// Indicator values computed at the latest bar of one series.
///
/// Immutable once computed; derived purely from the input candles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: MacdOutput,
    pub bollinger: BollingerOutput,
    pub cmf: f64,
    pub adx: AdxOutput,
    pub atr: f64,
    /// Close of the latest bar.
    pub close: f64,
}

impl IndicatorSnapshot {
    /// Compute the full snapshot for `symbol` over `candles`.
    ///
    /// Short history yields `InsufficientHistory`; degenerate input that an
    /// indicator cannot price (zero volume, non-finite values) yields
    /// `Computation`. Both exclude the instrument from the cycle without
    /// failing it.
    pub fn compute(symbol: &str, candles: &[Candle]) -> Result<Self, ScanError> {
        if candles.len() < MIN_LOOKBACK {
            return Err(ScanError::InsufficientHistory {
                symbol: symbol.to_string(),
                have: candles.len(),
                need: MIN_LOOKBACK,
            });
        }

        if let Some(index) = series_ordering_violation(candles) {
            return Err(ScanError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("series not strictly time-ordered at index {index}"),
            });
        }

        let degenerate = |what: &str| ScanError::Computation {
            symbol: symbol.to_string(),
            reason: format!("{what} undefined for this series"),
        };

        let rsi = Rsi::default()
            .compute(candles)
            .ok_or_else(|| degenerate("RSI"))?;
        let macd = Macd::default()
            .compute(candles)
            .ok_or_else(|| degenerate("MACD"))?;
        let bollinger = BollingerBands::default()
            .compute(candles)
            .ok_or_else(|| degenerate("Bollinger bands"))?;
        let cmf = Cmf::default()
            .compute(candles)
            .ok_or_else(|| degenerate("CMF"))?;
        let adx = Adx::default()
            .compute(candles)
            .ok_or_else(|| degenerate("ADX"))?;
        let atr = Atr::default()
            .compute(candles)
            .ok_or_else(|| degenerate("ATR"))?;
        let close = candles.last().map(|c| c.close).ok_or_else(|| degenerate("close"))?;

        let snapshot = Self {
            rsi,
            macd,
            bollinger,
            cmf,
            adx,
            atr,
            close,
        };

        if !snapshot.is_finite() {
            return Err(degenerate("indicator values"));
        }

        Ok(snapshot)
    }

    fn is_finite(&self) -> bool {
        self.rsi.is_finite()
            && self.macd.line.is_finite()
            && self.macd.signal.is_finite()
            && self.macd.histogram.is_finite()
            && self.bollinger.upper.is_finite()
            && self.bollinger.middle.is_finite()
            && self.bollinger.lower.is_finite()
            && self.bollinger.percent_b.is_finite()
            && self.cmf.is_finite()
            && self.adx.adx.is_finite()
            && self.atr.is_finite()
            && self.close.is_finite()
    }
}
