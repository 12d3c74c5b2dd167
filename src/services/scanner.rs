//! Scan cycle orchestration.
//!
//! One scanner owns the whole pipeline: candidate discovery, bounded
//! concurrent scoring, fine-timeframe verification, ranking and gated
//! emission. Cycles run on a fixed interval and never overlap; a cycle
//! that overruns simply delays the next one.

use crate::config::Config;
use crate::error::ScanError;
use crate::services::indicators::IndicatorSnapshot;
use crate::services::notifier::{format_signal_message, TelegramNotifier};
use crate::services::rate_limit::{DenyReason, EmissionGate, GateStats};
use crate::services::scorer::Scorer;
use crate::services::verifier;
use crate::sources::MarketData;
use crate::types::{CandidateCoin, CycleSummary, ScanState, SignalCandidate, Timeframe, Verdict};
use chrono::Utc;
use futures_util::{stream, StreamExt};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Coarse-timeframe bars fetched per instrument. Comfortably above the
/// indicator lookback so Wilder smoothing has room to settle.
const COARSE_LIMIT: usize = 100;
/// Fine-timeframe bars fetched per surviving candidate.
const FINE_LIMIT: usize = 50;

/// The scan orchestrator. Generic over the market data source so tests
/// can drive it with a scripted market.
pub struct Scanner<M: MarketData> {
    config: Config,
    market: M,
    scorer: Scorer,
    notifier: Option<TelegramNotifier>,
    gate: Mutex<EmissionGate>,
    status: RwLock<CycleSummary>,
}

impl<M: MarketData> Scanner<M> {
    pub fn new(config: Config, market: M, scorer: Scorer) -> Self {
        let notifier = match (&config.telegram_bot_token, &config.telegram_chat_id) {
            (Some(token), Some(chat)) => Some(TelegramNotifier::new(
                token.clone(),
                chat.clone(),
                config.request_timeout(),
            )),
            _ => {
                info!("Telegram credentials absent, signals will be logged only");
                None
            }
        };
        let gate = EmissionGate::new(config.max_signals_per_hour, config.cooldown_ms());

        Self {
            config,
            market,
            scorer,
            notifier,
            gate: Mutex::new(gate),
            status: RwLock::new(CycleSummary::empty()),
        }
    }

    /// Snapshot of the current (or last completed) cycle.
    pub async fn status(&self) -> CycleSummary {
        self.status.read().await.clone()
    }

    /// Emission gate counters as of now.
    pub async fn gate_stats(&self) -> GateStats {
        self.gate.lock().await.stats(Utc::now().timestamp_millis())
    }

    /// Run scan cycles on the configured interval until shutdown is
    /// signalled. Shutdown between cycles is immediate; a cycle in
    /// flight notices the signal at its next stage boundary and
    /// abandons its partial results unemitted.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.config.scan_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut cycle: u64 = 0;

        info!(
            "Scanner started: every {}s, up to {} instruments per cycle",
            self.config.scan_interval_secs, self.config.max_symbols_per_scan
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    cycle += 1;
                    self.run_cycle(cycle, &shutdown).await;
                }
                _ = shutdown.changed() => {
                    info!("Scanner shutting down after {} cycles", cycle);
                    return;
                }
            }
        }
    }

    /// One full pipeline pass. Per-instrument failures are skipped;
    /// only a failed candidate fetch aborts the cycle. The shutdown
    /// flag is checked at every stage boundary so a signalled shutdown
    /// discards partial results instead of emitting them.
    pub async fn run_cycle(&self, cycle: u64, shutdown: &watch::Receiver<bool>) {
        let started = Utc::now().timestamp_millis();
        self.begin_cycle(cycle, started).await;

        let candidates = match self.fetch_candidates().await {
            Ok(coins) => coins,
            Err(e) => {
                error!("Cycle {} aborted: {}", cycle, e);
                self.set_state(ScanState::Idle).await;
                return;
            }
        };
        let scanned = candidates.len();
        if self.abandon_on_shutdown(cycle, shutdown).await {
            return;
        }

        self.set_state(ScanState::Scoring).await;
        let scored = self.score_candidates(candidates).await;
        if self.abandon_on_shutdown(cycle, shutdown).await {
            return;
        }

        self.set_state(ScanState::Verifying).await;
        let verified = self.verify_candidates(scored).await;
        if self.abandon_on_shutdown(cycle, shutdown).await {
            return;
        }

        self.set_state(ScanState::Ranking).await;
        let ranked = self.rank(verified);

        self.set_state(ScanState::Emitting).await;
        let emitted = self.emit(&ranked, started).await;

        let mut status = self.status.write().await;
        status.state = ScanState::Idle;
        status.instruments_scanned = scanned;
        status.candidates_found = ranked.len();
        status.signals_emitted = emitted;
        drop(status);

        info!(
            "Cycle {} complete: {} scanned, {} qualified, {} emitted",
            cycle,
            scanned,
            ranked.len(),
            emitted
        );
    }

    /// True (after resetting to idle) when shutdown has been signalled
    /// and the in-flight cycle must drop whatever it has so far.
    async fn abandon_on_shutdown(&self, cycle: u64, shutdown: &watch::Receiver<bool>) -> bool {
        if *shutdown.borrow() {
            info!("Cycle {} abandoned by shutdown, partial results discarded", cycle);
            self.set_state(ScanState::Idle).await;
            return true;
        }
        false
    }

    async fn begin_cycle(&self, cycle: u64, started: i64) {
        let mut status = self.status.write().await;
        *status = CycleSummary {
            cycle,
            timestamp: started,
            state: ScanState::FetchingCandidates,
            instruments_scanned: 0,
            candidates_found: 0,
            signals_emitted: 0,
        };
    }

    async fn set_state(&self, state: ScanState) {
        self.status.write().await.state = state;
    }

    async fn fetch_candidates(&self) -> Result<Vec<CandidateCoin>, ScanError> {
        let mut coins = self
            .market
            .top_volume_pairs(self.config.min_quote_volume)
            .await?;
        coins.truncate(self.config.max_symbols_per_scan);
        debug!("Scan universe: {} instruments", coins.len());
        Ok(coins)
    }

    /// Fetch coarse history and score every instrument, with bounded
    /// concurrency. The scan-order index rides along for ranking
    /// tie-breaks later.
    async fn score_candidates(
        &self,
        coins: Vec<CandidateCoin>,
    ) -> Vec<(usize, SignalCandidate)> {
        let results: Vec<Option<(usize, SignalCandidate)>> = stream::iter(
            coins.into_iter().enumerate(),
        )
        .map(|(index, coin)| async move {
            match self.score_one(&coin.symbol).await {
                Ok(candidate) => Some((index, candidate)),
                Err(ScanError::InsufficientHistory { symbol, have, need }) => {
                    debug!("{}: {} of {} bars, skipped", symbol, have, need);
                    None
                }
                Err(e) => {
                    warn!("Scoring failed, instrument skipped: {}", e);
                    None
                }
            }
        })
        .buffer_unordered(self.config.fetch_concurrency)
        .collect()
        .await;

        let mut scored: Vec<(usize, SignalCandidate)> = results.into_iter().flatten().collect();
        // buffer_unordered scrambles completion order
        scored.sort_by_key(|(index, _)| *index);
        scored
    }

    async fn score_one(&self, symbol: &str) -> Result<SignalCandidate, ScanError> {
        let candles = self
            .market
            .klines(symbol, Timeframe::FifteenMin, COARSE_LIMIT)
            .await?;
        let snapshot = IndicatorSnapshot::compute(symbol, &candles)?;
        Ok(self.scorer.score(symbol, &snapshot))
    }

    /// Re-check directional candidates against fresh fine-timeframe
    /// candles. Rejected candidates are dropped; a failed fine fetch
    /// skips the instrument rather than passing it unverified.
    async fn verify_candidates(
        &self,
        scored: Vec<(usize, SignalCandidate)>,
    ) -> Vec<(usize, SignalCandidate)> {
        let mut verified = Vec::new();
        for (index, mut candidate) in scored {
            if !candidate.is_directional() {
                continue;
            }
            let fine = match self
                .market
                .klines(&candidate.symbol, Timeframe::FiveMin, FINE_LIMIT)
                .await
            {
                Ok(candles) => candles,
                Err(e) => {
                    warn!("{}: fine fetch failed, candidate dropped: {}", candidate.symbol, e);
                    continue;
                }
            };
            let result = verifier::verify(&mut candidate, &fine);
            debug!(
                "{} {}: {:?} ({})",
                candidate.symbol,
                candidate.direction.label(),
                result.verdict,
                result.reason
            );
            if result.verdict != Verdict::Reject {
                verified.push((index, candidate));
            }
        }
        verified
    }

    /// Filter by the confidence floor, then order by confidence, score
    /// margin and finally scan order so equal candidates rank
    /// deterministically.
    fn rank(&self, verified: Vec<(usize, SignalCandidate)>) -> Vec<SignalCandidate> {
        let mut qualified: Vec<(usize, SignalCandidate)> = verified
            .into_iter()
            .filter(|(_, c)| c.confidence >= self.config.min_confidence)
            .collect();

        qualified.sort_by(|(ia, a), (ib, b)| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.score_margin()
                        .partial_cmp(&a.score_margin())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| ia.cmp(ib))
        });

        qualified.into_iter().map(|(_, c)| c).collect()
    }

    /// Push the top-ranked candidates through the emission gate and
    /// deliver those it allows. Delivery failure never unwinds the
    /// emission record; the signal stands as detected but undelivered.
    async fn emit(&self, ranked: &[SignalCandidate], now_ms: i64) -> usize {
        let mut emitted = 0;
        let mut gate = self.gate.lock().await;

        for candidate in ranked {
            if emitted >= self.config.top_k {
                break;
            }
            match gate.try_emit(&candidate.symbol, candidate.direction, now_ms) {
                Ok(signal_id) => {
                    emitted += 1;
                    info!(
                        "Signal {} emitted: {} {} at {:.1}% confidence",
                        signal_id,
                        candidate.symbol,
                        candidate.direction.label(),
                        candidate.confidence
                    );
                    match &self.notifier {
                        Some(notifier) => {
                            if let Err(e) = notifier.send_signal(candidate, signal_id).await {
                                warn!("Signal {} delivery failed: {}", signal_id, e);
                            }
                        }
                        None => {
                            info!("{}", format_signal_message(candidate, signal_id));
                        }
                    }
                }
                Err(DenyReason::Cooldown) => {
                    debug!(
                        "{} {} suppressed by cooldown",
                        candidate.symbol,
                        candidate.direction.label()
                    );
                }
                Err(DenyReason::HourlyLimit) => {
                    info!("Hourly signal budget exhausted, remaining candidates held");
                    break;
                }
            }
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Candle, Direction, TradeLevels};

    fn candidate(symbol: &str, confidence: f64, margin: f64) -> SignalCandidate {
        SignalCandidate {
            symbol: symbol.to_string(),
            direction: Direction::Long,
            long_score: 3.0 + margin,
            short_score: 3.0,
            confidence,
            levels: Some(TradeLevels {
                entry: 100.0,
                stop_loss: 97.0,
                take_profits: [103.0, 106.0, 109.0],
            }),
            reasons: vec![],
        }
    }

    struct NoMarket;

    impl MarketData for NoMarket {
        async fn top_volume_pairs(&self, _: f64) -> Result<Vec<CandidateCoin>, ScanError> {
            Ok(vec![])
        }

        async fn klines(
            &self,
            symbol: &str,
            _: Timeframe,
            _: usize,
        ) -> Result<Vec<Candle>, ScanError> {
            Err(ScanError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no data".to_string(),
            })
        }
    }

    fn scanner(config: Config) -> Scanner<NoMarket> {
        let scorer = Scorer::new(&config);
        Scanner::new(config, NoMarket, scorer)
    }

    fn no_shutdown() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[test]
    fn test_ranking_orders_by_confidence_then_margin_then_scan_order() {
        let s = scanner(Config::default());
        let ranked = s.rank(vec![
            (2, candidate("C-USDT", 80.0, 1.0)),
            (0, candidate("A-USDT", 90.0, 1.0)),
            (3, candidate("D-USDT", 80.0, 2.0)),
            (1, candidate("B-USDT", 80.0, 1.0)),
        ]);
        let symbols: Vec<&str> = ranked.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["A-USDT", "D-USDT", "B-USDT", "C-USDT"]);
    }

    #[test]
    fn test_ranking_applies_confidence_floor() {
        let s = scanner(Config::default());
        let ranked = s.rank(vec![
            (0, candidate("A-USDT", 69.9, 1.0)),
            (1, candidate("B-USDT", 70.0, 1.0)),
        ]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].symbol, "B-USDT");
    }

    #[tokio::test]
    async fn test_emit_respects_top_k() {
        let config = Config {
            top_k: 1,
            ..Config::default()
        };
        let s = scanner(config);
        let ranked = vec![
            candidate("A-USDT", 90.0, 1.0),
            candidate("B-USDT", 85.0, 1.0),
        ];
        let emitted = s.emit(&ranked, 1_700_000_000_000).await;
        assert_eq!(emitted, 1);
    }

    #[tokio::test]
    async fn test_emit_skips_cooldown_without_consuming_slot() {
        let config = Config {
            top_k: 1,
            ..Config::default()
        };
        let s = scanner(config);
        let t0 = 1_700_000_000_000;
        // First cycle emits A; second cycle finds A again plus B.
        assert_eq!(s.emit(&[candidate("A-USDT", 90.0, 1.0)], t0).await, 1);
        let ranked = vec![
            candidate("A-USDT", 92.0, 1.0),
            candidate("B-USDT", 85.0, 1.0),
        ];
        let emitted = s.emit(&ranked, t0 + 300_000).await;
        assert_eq!(emitted, 1);
        let stats = s.gate_stats().await;
        assert_eq!(stats.total_emitted, 2);
    }

    #[tokio::test]
    async fn test_cycle_with_failing_universe_is_survivable() {
        struct DownMarket;
        impl MarketData for DownMarket {
            async fn top_volume_pairs(&self, _: f64) -> Result<Vec<CandidateCoin>, ScanError> {
                Err(ScanError::CandidateListUnavailable("venue down".to_string()))
            }
            async fn klines(
                &self,
                _: &str,
                _: Timeframe,
                _: usize,
            ) -> Result<Vec<Candle>, ScanError> {
                unreachable!()
            }
        }
        let config = Config::default();
        let scorer = Scorer::new(&config);
        let s = Scanner::new(config, DownMarket, scorer);
        s.run_cycle(1, &no_shutdown()).await;
        let status = s.status().await;
        assert_eq!(status.state, ScanState::Idle);
        assert_eq!(status.signals_emitted, 0);
    }

    #[tokio::test]
    async fn test_signalled_shutdown_abandons_the_cycle() {
        let s = scanner(Config::default());
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        s.run_cycle(1, &rx).await;
        let status = s.status().await;
        assert_eq!(status.state, ScanState::Idle);
        assert_eq!(status.signals_emitted, 0);
        assert_eq!(s.gate_stats().await.total_emitted, 0);
    }
}
