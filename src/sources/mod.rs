//! Market data providers.

pub mod kucoin;

pub use kucoin::KuCoinClient;

use crate::error::ScanError;
use crate::types::{Candle, CandidateCoin, Timeframe};
use std::future::Future;

/// A market data venue: volume-ranked scan universe plus candle history.
///
/// A trait seam so the scan orchestrator can be driven by a scripted
/// market in tests. Implementations return either a valid series or an
/// explicit error; they never block indefinitely.
pub trait MarketData: Send + Sync {
    /// Pairs ranked by descending 24h quote volume, filtered by the
    /// minimum quote volume.
    fn top_volume_pairs(
        &self,
        min_quote_volume: f64,
    ) -> impl Future<Output = Result<Vec<CandidateCoin>, ScanError>> + Send;

    /// The most recent `limit` candles for a pair, oldest first.
    fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Candle>, ScanError>> + Send;
}
