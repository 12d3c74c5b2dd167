//! Fine-timeframe signal confirmation.
//!
//! The coarse scan has detection lag; this is the cheap, narrow re-check
//! against fresher 5-minute candles that suppresses stale or
//! already-reversed signals before they reach the notifier.

use crate::services::indicators::Macd;
use crate::types::{Candle, Direction, SignalCandidate, Verdict};

/// Confidence delta applied on ACCEPT / ADJUST.
pub const ACCEPT_BOOST: f64 = 10.0;
pub const ADJUST_PENALTY: f64 = 10.0;

/// Outcome of verifying one candidate.
#[derive(Debug, Clone)]
pub struct Verification {
    pub verdict: Verdict,
    /// Alignment checks passed, out of 3.
    pub checks_passed: u8,
    pub reason: String,
}

/// Re-evaluate a directional candidate against a fine-timeframe series,
/// mutating its confidence (and entry, on accept) in place.
///
/// Three alignment checks: fine MACD histogram sign, last close against
/// the prior close, and the body direction of the last candle. None
/// passing means the move has already reversed; the candidate is
/// rejected outright.
pub fn verify(candidate: &mut SignalCandidate, fine_candles: &[Candle]) -> Verification {
    debug_assert!(candidate.is_directional());

    let macd = Macd::default().compute(fine_candles);
    let (last, prev) = match (
        fine_candles.last(),
        fine_candles.len().checked_sub(2).and_then(|i| fine_candles.get(i)),
    ) {
        (Some(last), Some(prev)) => (last, prev),
        // Too little fine history to confirm or deny: keep the coarse
        // verdict but derate it.
        _ => {
            candidate.confidence -= ADJUST_PENALTY;
            candidate.clamp_confidence();
            let reason = "fine timeframe history too short to confirm".to_string();
            candidate.reasons.push(reason.clone());
            return Verification {
                verdict: Verdict::Adjust,
                checks_passed: 0,
                reason,
            };
        }
    };

    let mut checks_passed = 0u8;
    let mut total_checks = 2u8;

    match candidate.direction {
        Direction::Long => {
            if let Some(m) = &macd {
                total_checks += 1;
                if m.histogram > 0.0 {
                    checks_passed += 1;
                }
            }
            if last.close > prev.close {
                checks_passed += 1;
            }
            if last.close > last.open {
                checks_passed += 1;
            }
        }
        Direction::Short => {
            if let Some(m) = &macd {
                total_checks += 1;
                if m.histogram < 0.0 {
                    checks_passed += 1;
                }
            }
            if last.close < prev.close {
                checks_passed += 1;
            }
            if last.close < last.open {
                checks_passed += 1;
            }
        }
        Direction::Neutral => {
            return Verification {
                verdict: Verdict::Reject,
                checks_passed: 0,
                reason: "neutral candidate has nothing to confirm".to_string(),
            }
        }
    }

    let (verdict, reason) = if checks_passed == 0 {
        (
            Verdict::Reject,
            format!(
                "fine timeframe contradicts {} (0/{total_checks} checks)",
                candidate.direction.label()
            ),
        )
    } else if checks_passed >= 2 {
        (
            Verdict::Accept,
            format!(
                "fine timeframe aligned with {} ({checks_passed}/{total_checks} checks)",
                candidate.direction.label()
            ),
        )
    } else {
        (
            Verdict::Adjust,
            format!(
                "fine timeframe ambiguous ({checks_passed}/{total_checks} checks)",
            ),
        )
    };

    match verdict {
        Verdict::Accept => {
            candidate.confidence += ACCEPT_BOOST;
            // Re-anchor the entry to the freshest close; the stop and
            // take-profits from the coarse structure stand.
            if let Some(levels) = candidate.levels.as_mut() {
                let refreshed = last.close;
                let still_consistent = {
                    let mut trial = *levels;
                    trial.entry = refreshed;
                    trial.is_consistent(candidate.direction)
                };
                if still_consistent {
                    levels.entry = refreshed;
                }
            }
        }
        Verdict::Adjust => candidate.confidence -= ADJUST_PENALTY,
        Verdict::Reject => {}
    }
    candidate.clamp_confidence();
    candidate.reasons.push(reason.clone());

    Verification {
        verdict,
        checks_passed,
        reason,
    }
}
