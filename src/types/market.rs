use serde::{Deserialize, Serialize};
use std::fmt;

/// A single OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix timestamp (milliseconds) of bar open.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle timeframe used by the scanner.
///
/// The coarse timeframe drives scoring; the fine timeframe drives
/// confirmation of already-promising candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    FiveMin,
    FifteenMin,
}

impl Timeframe {
    /// KuCoin kline type string for this timeframe.
    pub fn kucoin_type(&self) -> &'static str {
        match self {
            Timeframe::FiveMin => "5min",
            Timeframe::FifteenMin => "15min",
        }
    }

    /// Bar duration in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            Timeframe::FiveMin => 300,
            Timeframe::FifteenMin => 900,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kucoin_type())
    }
}

/// One entry of the volume-ranked scan universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateCoin {
    /// Trading pair, e.g. "BTC-USDT".
    pub symbol: String,
    /// 24h quote-currency volume in USDT.
    pub quote_volume: f64,
    /// Last traded price.
    pub last_price: f64,
}

/// Validate that a candle series is strictly ordered in time with no
/// duplicate timestamps. Returns the first offending index on failure.
pub fn series_ordering_violation(candles: &[Candle]) -> Option<usize> {
    candles
        .windows(2)
        .position(|w| w[1].time <= w[0].time)
        .map(|i| i + 1)
}
