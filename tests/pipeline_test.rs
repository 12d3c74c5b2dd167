//! End-to-end scan cycle tests against a scripted market.

use specter::config::Config;
use specter::error::ScanError;
use specter::services::{Scanner, Scorer};
use specter::sources::MarketData;
use specter::types::{Candle, CandidateCoin, ScanState, Timeframe};
use std::collections::HashMap;
use tokio::sync::watch;

/// A market whose responses are fixed up front.
#[derive(Default)]
struct ScriptedMarket {
    universe: Vec<CandidateCoin>,
    universe_down: bool,
    coarse: HashMap<String, Vec<Candle>>,
    fine: HashMap<String, Vec<Candle>>,
}

impl ScriptedMarket {
    fn with_pair(mut self, symbol: &str, coarse: Vec<Candle>, fine: Vec<Candle>) -> Self {
        self.universe.push(CandidateCoin {
            symbol: symbol.to_string(),
            quote_volume: 5_000_000.0,
            last_price: coarse.last().map(|c| c.close).unwrap_or(1.0),
        });
        self.coarse.insert(symbol.to_string(), coarse);
        self.fine.insert(symbol.to_string(), fine);
        self
    }
}

impl MarketData for ScriptedMarket {
    async fn top_volume_pairs(
        &self,
        min_quote_volume: f64,
    ) -> Result<Vec<CandidateCoin>, ScanError> {
        if self.universe_down {
            return Err(ScanError::CandidateListUnavailable("venue down".to_string()));
        }
        Ok(self
            .universe
            .iter()
            .filter(|c| c.quote_volume >= min_quote_volume)
            .cloned()
            .collect())
    }

    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        _limit: usize,
    ) -> Result<Vec<Candle>, ScanError> {
        let map = match timeframe {
            Timeframe::FiveMin => &self.fine,
            Timeframe::FifteenMin => &self.coarse,
        };
        map.get(symbol)
            .cloned()
            .ok_or_else(|| ScanError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no scripted series".to_string(),
            })
    }
}

/// A steady decline whose bars close near their highs: oversold price
/// with accumulation-style flow. Scores strongly long.
fn accumulating_decline(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let base = 300.0 - i as f64;
            Candle {
                time: 1_000_000 + i as i64 * 900_000,
                open: base + 1.0,
                high: base + 1.2,
                low: base - 2.0,
                close: base,
                volume: 1500.0,
            }
        })
        .collect()
}

/// Mirror image: a steady rally whose bars close near their lows.
/// Scores strongly short.
fn distributing_rally(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let base = 100.0 + i as f64;
            Candle {
                time: 1_000_000 + i as i64 * 900_000,
                open: base - 1.0,
                high: base + 2.0,
                low: base - 1.2,
                close: base,
                volume: 1500.0,
            }
        })
        .collect()
}

fn rising_fine(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let base = 200.0 + i as f64 * 0.4;
            Candle {
                time: 1_000_000 + i as i64 * 300_000,
                open: base,
                high: base + 0.6,
                low: base - 0.2,
                close: base + 0.4,
                volume: 500.0,
            }
        })
        .collect()
}

fn falling_fine(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let base = 200.0 - i as f64 * 0.4;
            Candle {
                time: 1_000_000 + i as i64 * 300_000,
                open: base,
                high: base + 0.2,
                low: base - 0.6,
                close: base - 0.4,
                volume: 500.0,
            }
        })
        .collect()
}

fn flat(count: usize, price: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| Candle {
            time: 1_000_000 + i as i64 * 900_000,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 1500.0,
        })
        .collect()
}

fn scanner(market: ScriptedMarket) -> Scanner<ScriptedMarket> {
    let config = Config::default();
    let scorer = Scorer::new(&config);
    Scanner::new(config, market, scorer)
}

fn no_shutdown() -> watch::Receiver<bool> {
    watch::channel(false).1
}

#[tokio::test]
async fn oversold_accumulation_emits_a_signal() {
    let market =
        ScriptedMarket::default().with_pair("ALPHA-USDT", accumulating_decline(100), rising_fine(50));
    let s = scanner(market);
    s.run_cycle(1, &no_shutdown()).await;

    let status = s.status().await;
    assert_eq!(status.state, ScanState::Idle);
    assert_eq!(status.instruments_scanned, 1);
    assert_eq!(status.candidates_found, 1);
    assert_eq!(status.signals_emitted, 1);
}

#[tokio::test]
async fn overbought_distribution_emits_a_signal() {
    let market =
        ScriptedMarket::default().with_pair("BETA-USDT", distributing_rally(100), falling_fine(50));
    let s = scanner(market);
    s.run_cycle(1, &no_shutdown()).await;

    assert_eq!(s.status().await.signals_emitted, 1);
}

#[tokio::test]
async fn flat_market_emits_nothing() {
    let market = ScriptedMarket::default().with_pair("GAMMA-USDT", flat(100, 50.0), flat(50, 50.0));
    let s = scanner(market);
    s.run_cycle(1, &no_shutdown()).await;

    let status = s.status().await;
    assert_eq!(status.instruments_scanned, 1);
    assert_eq!(status.candidates_found, 0);
    assert_eq!(status.signals_emitted, 0);
}

#[tokio::test]
async fn contradicting_fine_timeframe_suppresses_the_signal() {
    // Strong long setup on the coarse timeframe, but the fresh fine
    // candles keep falling: the move is not confirmed.
    let market =
        ScriptedMarket::default().with_pair("DELTA-USDT", accumulating_decline(100), falling_fine(50));
    let s = scanner(market);
    s.run_cycle(1, &no_shutdown()).await;

    let status = s.status().await;
    assert_eq!(status.candidates_found, 0);
    assert_eq!(status.signals_emitted, 0);
}

#[tokio::test]
async fn short_history_instruments_are_skipped_not_fatal() {
    let market = ScriptedMarket::default()
        .with_pair("THIN-USDT", accumulating_decline(10), rising_fine(50))
        .with_pair("FULL-USDT", accumulating_decline(100), rising_fine(50));
    let s = scanner(market);
    s.run_cycle(1, &no_shutdown()).await;

    let status = s.status().await;
    assert_eq!(status.instruments_scanned, 2);
    assert_eq!(status.signals_emitted, 1);
}

#[tokio::test]
async fn unavailable_universe_aborts_the_cycle_cleanly() {
    let market = ScriptedMarket {
        universe_down: true,
        ..ScriptedMarket::default()
    };
    let s = scanner(market);
    s.run_cycle(1, &no_shutdown()).await;

    let status = s.status().await;
    assert_eq!(status.state, ScanState::Idle);
    assert_eq!(status.signals_emitted, 0);
}

#[tokio::test]
async fn repeat_cycle_is_suppressed_by_cooldown() {
    let market =
        ScriptedMarket::default().with_pair("ALPHA-USDT", accumulating_decline(100), rising_fine(50));
    let s = scanner(market);

    s.run_cycle(1, &no_shutdown()).await;
    assert_eq!(s.status().await.signals_emitted, 1);

    // Same data a cycle later: the signal still qualifies but the
    // symbol+direction pair is inside its cooldown window.
    s.run_cycle(2, &no_shutdown()).await;
    let status = s.status().await;
    assert_eq!(status.cycle, 2);
    assert_eq!(status.candidates_found, 1);
    assert_eq!(status.signals_emitted, 0);

    assert_eq!(s.gate_stats().await.total_emitted, 1);
}

#[tokio::test]
async fn shutdown_mid_cycle_discards_a_qualifying_signal() {
    // The same setup that emits in oversold_accumulation_emits_a_signal
    // must produce nothing once shutdown has been signalled.
    let market =
        ScriptedMarket::default().with_pair("ALPHA-USDT", accumulating_decline(100), rising_fine(50));
    let s = scanner(market);

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    s.run_cycle(1, &rx).await;

    let status = s.status().await;
    assert_eq!(status.state, ScanState::Idle);
    assert_eq!(status.signals_emitted, 0);
    assert_eq!(s.gate_stats().await.total_emitted, 0);
}

#[tokio::test]
async fn identical_input_produces_identical_outcome() {
    let build = || {
        ScriptedMarket::default()
            .with_pair("ALPHA-USDT", accumulating_decline(100), rising_fine(50))
            .with_pair("GAMMA-USDT", flat(100, 50.0), flat(50, 50.0))
    };

    let a = scanner(build());
    let b = scanner(build());
    a.run_cycle(1, &no_shutdown()).await;
    b.run_cycle(1, &no_shutdown()).await;

    let sa = a.status().await;
    let sb = b.status().await;
    assert_eq!(sa.candidates_found, sb.candidates_found);
    assert_eq!(sa.signals_emitted, sb.signals_emitted);
}

#[tokio::test]
async fn top_k_bounds_emissions_per_cycle() {
    let market = ScriptedMarket::default()
        .with_pair("ALPHA-USDT", accumulating_decline(100), rising_fine(50))
        .with_pair("BETA-USDT", distributing_rally(100), falling_fine(50));
    let config = Config {
        top_k: 1,
        ..Config::default()
    };
    let scorer = Scorer::new(&config);
    let s = Scanner::new(config, market, scorer);
    s.run_cycle(1, &no_shutdown()).await;

    let status = s.status().await;
    assert_eq!(status.candidates_found, 2);
    assert_eq!(status.signals_emitted, 1);
}
