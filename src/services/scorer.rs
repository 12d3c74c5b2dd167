//! Multi-factor signal scoring.
//!
//! Combines one coarse-timeframe indicator snapshot into a directional
//! candidate via point accumulation: four oscillator factors worth one
//! point per side plus an ADX trend point. ADX above 25 is also a hard
//! gate; oscillator agreement in a ranging market is discarded.

use crate::config::Config;
use crate::services::indicators::IndicatorSnapshot;
use crate::types::{Direction, SignalCandidate, TradeLevels};
use std::sync::Arc;

/// RSI boundaries feeding the long/short scores.
pub const RSI_OVERSOLD: f64 = 40.0;
pub const RSI_OVERBOUGHT: f64 = 60.0;
/// %B proximity bands: at/below the lower band, at/above the upper.
pub const PERCENT_B_LOW: f64 = 0.15;
pub const PERCENT_B_HIGH: f64 = 0.85;
/// ADX trend-strength gate.
pub const ADX_TREND_THRESHOLD: f64 = 25.0;
/// Points required for a directional verdict, and the required lead
/// over the opposing side.
pub const MIN_POINTS: f64 = 3.0;
pub const MIN_MARGIN: f64 = 1.0;
/// Maximum achievable points per side (four oscillators + trend).
pub const MAX_POINTS: f64 = 5.0;
/// Stop distance in ATR units.
pub const STOP_ATR_MULTIPLE: f64 = 1.5;

/// Optional external confirmation model producing a [0,1] score for a
/// prospective signal. Absence degrades to a neutral weight; it can
/// temper or reinforce confidence but never blocks scoring.
pub trait AdvisoryModel: Send + Sync {
    fn confirm(&self, symbol: &str, snapshot: &IndicatorSnapshot) -> Option<f64>;
}

/// Signal scorer configured from the application settings.
pub struct Scorer {
    min_reward_risk: f64,
    advisory: Option<Arc<dyn AdvisoryModel>>,
}

impl Scorer {
    pub fn new(config: &Config) -> Self {
        Self {
            min_reward_risk: config.min_reward_risk,
            advisory: None,
        }
    }

    pub fn with_advisory(mut self, advisory: Arc<dyn AdvisoryModel>) -> Self {
        self.advisory = Some(advisory);
        self
    }

    /// Score one snapshot into a candidate. Deterministic for identical
    /// input: the same snapshot always yields the same verdict.
    pub fn score(&self, symbol: &str, snapshot: &IndicatorSnapshot) -> SignalCandidate {
        let mut long_points = 0.0;
        let mut short_points = 0.0;
        let mut long_reasons: Vec<String> = Vec::new();
        let mut short_reasons: Vec<String> = Vec::new();

        if snapshot.rsi < RSI_OVERSOLD {
            long_points += 1.0;
            long_reasons.push(format!("RSI {:.1} oversold (< {RSI_OVERSOLD})", snapshot.rsi));
        } else if snapshot.rsi > RSI_OVERBOUGHT {
            short_points += 1.0;
            short_reasons.push(format!(
                "RSI {:.1} overbought (> {RSI_OVERBOUGHT})",
                snapshot.rsi
            ));
        }

        if snapshot.macd.histogram > 0.0 {
            long_points += 1.0;
            long_reasons.push(format!(
                "MACD histogram {:+.4} bullish",
                snapshot.macd.histogram
            ));
        } else if snapshot.macd.histogram < 0.0 {
            short_points += 1.0;
            short_reasons.push(format!(
                "MACD histogram {:+.4} bearish",
                snapshot.macd.histogram
            ));
        }

        if snapshot.bollinger.percent_b <= PERCENT_B_LOW {
            long_points += 1.0;
            long_reasons.push(format!(
                "close at lower Bollinger band (%B {:.2})",
                snapshot.bollinger.percent_b
            ));
        } else if snapshot.bollinger.percent_b >= PERCENT_B_HIGH {
            short_points += 1.0;
            short_reasons.push(format!(
                "close at upper Bollinger band (%B {:.2})",
                snapshot.bollinger.percent_b
            ));
        }

        if snapshot.cmf > 0.0 {
            long_points += 1.0;
            long_reasons.push(format!("CMF {:+.2} accumulation", snapshot.cmf));
        } else if snapshot.cmf < 0.0 {
            short_points += 1.0;
            short_reasons.push(format!("CMF {:+.2} distribution", snapshot.cmf));
        }

        // Trend-strength gate: without ADX confirmation, oscillator
        // agreement in a ranging market is discarded entirely.
        let adx = snapshot.adx.adx;
        if adx <= ADX_TREND_THRESHOLD {
            let mut reasons = Vec::new();
            if long_points > 0.0 || short_points > 0.0 {
                let side = if long_points >= short_points {
                    "long"
                } else {
                    "short"
                };
                reasons.push(format!(
                    "{side} factors present but ADX {adx:.1} below trend threshold {ADX_TREND_THRESHOLD}"
                ));
            } else {
                reasons.push(format!("no directional factors; ADX {adx:.1}"));
            }
            return SignalCandidate::neutral(symbol.to_string(), long_points, short_points, reasons);
        }

        // The trend point goes to the side already leading on oscillators.
        if long_points > short_points {
            long_points += 1.0;
            long_reasons.push(format!("ADX {adx:.1} confirms trend strength"));
        } else if short_points > long_points {
            short_points += 1.0;
            short_reasons.push(format!("ADX {adx:.1} confirms trend strength"));
        }

        let (direction, points, opposing, mut reasons) = if long_points > short_points {
            (Direction::Long, long_points, short_points, long_reasons)
        } else if short_points > long_points {
            (Direction::Short, short_points, long_points, short_reasons)
        } else {
            return SignalCandidate::neutral(
                symbol.to_string(),
                long_points,
                short_points,
                vec!["long and short factors balanced".to_string()],
            );
        };

        if points < MIN_POINTS {
            reasons.push(format!(
                "{} score {points:.1} below minimum {MIN_POINTS:.1}",
                direction.label()
            ));
            return SignalCandidate::neutral(symbol.to_string(), long_points, short_points, reasons);
        }
        if points - opposing < MIN_MARGIN {
            reasons.push(format!(
                "score margin {:.1} below minimum {MIN_MARGIN:.1}",
                points - opposing
            ));
            return SignalCandidate::neutral(symbol.to_string(), long_points, short_points, reasons);
        }

        let levels = match self.trade_levels(direction, snapshot) {
            Ok(levels) => levels,
            Err(reason) => {
                reasons.push(reason);
                return SignalCandidate::neutral(
                    symbol.to_string(),
                    long_points,
                    short_points,
                    reasons,
                );
            }
        };

        // Reward:risk gate: a strong score with no room to the first
        // target is still not a trade.
        match levels.reward_risk() {
            Some(rr) if rr >= self.min_reward_risk => {
                reasons.push(format!(
                    "reward:risk {rr:.2} meets minimum {:.2}",
                    self.min_reward_risk
                ));
            }
            Some(rr) => {
                reasons.push(format!(
                    "reward:risk {rr:.2} below minimum {:.2}",
                    self.min_reward_risk
                ));
                return SignalCandidate::neutral(
                    symbol.to_string(),
                    long_points,
                    short_points,
                    reasons,
                );
            }
            None => {
                reasons.push("stop distance degenerate".to_string());
                return SignalCandidate::neutral(
                    symbol.to_string(),
                    long_points,
                    short_points,
                    reasons,
                );
            }
        }

        let advisory_score = self
            .advisory
            .as_ref()
            .and_then(|model| model.confirm(symbol, snapshot))
            .map(|a| a.clamp(0.0, 1.0));
        if let Some(a) = advisory_score {
            reasons.push(format!("advisory confirmation {a:.2}"));
        }

        let confidence = Self::confidence(points, advisory_score);

        SignalCandidate {
            symbol: symbol.to_string(),
            direction,
            long_score: long_points,
            short_score: short_points,
            confidence,
            levels: Some(levels),
            reasons,
        }
    }

    /// Confidence from point total, scaled by the advisory factor.
    /// A neutral advisory (0.5, also the default when absent) leaves the
    /// base value untouched.
    fn confidence(points: f64, advisory: Option<f64>) -> f64 {
        let base = (points / MAX_POINTS) * 100.0;
        let a = advisory.unwrap_or(0.5);
        (base * (0.85 + 0.30 * a)).clamp(0.0, 100.0)
    }

    /// Entry at the last close, stop at 1.5 ATR against the trade, and
    /// take-profits laddered off the Bollinger structure: middle band,
    /// far band, far band plus one half-width.
    fn trade_levels(
        &self,
        direction: Direction,
        snapshot: &IndicatorSnapshot,
    ) -> Result<TradeLevels, String> {
        if snapshot.atr <= 0.0 {
            return Err("ATR zero; volatility unit undefined".to_string());
        }

        let entry = snapshot.close;
        let risk = STOP_ATR_MULTIPLE * snapshot.atr;
        let bands = &snapshot.bollinger;

        let levels = match direction {
            Direction::Long => TradeLevels {
                entry,
                stop_loss: entry - risk,
                take_profits: [
                    bands.middle,
                    bands.upper,
                    bands.upper + (bands.upper - bands.middle),
                ],
            },
            Direction::Short => TradeLevels {
                entry,
                stop_loss: entry + risk,
                take_profits: [
                    bands.middle,
                    bands.lower,
                    bands.lower - (bands.middle - bands.lower),
                ],
            },
            Direction::Neutral => return Err("no levels for a neutral verdict".to_string()),
        };

        if !levels.is_consistent(direction) {
            return Err("take-profit ladder inconsistent with entry/stop".to_string());
        }

        Ok(levels)
    }
}
