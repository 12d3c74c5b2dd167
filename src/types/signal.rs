use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a trading opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl Direction {
    /// Get display label for this direction.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
            Direction::Neutral => "NEUTRAL",
        }
    }

    /// The opposing directional verdict. Neutral has no opposite.
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
            Direction::Neutral => Direction::Neutral,
        }
    }
}

/// Entry, stop and take-profit levels for a directional candidate.
///
/// Take-profits are strictly ordered in the trade direction (TP1 nearest
/// to entry); the stop is on the opposite side of entry from all of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profits: [f64; 3],
}

impl TradeLevels {
    /// TP1 reward divided by stop risk. Returns None on a degenerate
    /// (zero-distance) stop.
    pub fn reward_risk(&self) -> Option<f64> {
        let risk = (self.entry - self.stop_loss).abs();
        if risk <= 0.0 || !risk.is_finite() {
            return None;
        }
        Some((self.take_profits[0] - self.entry).abs() / risk)
    }

    /// Check the level ordering invariants for the given direction.
    pub fn is_consistent(&self, direction: Direction) -> bool {
        let [tp1, tp2, tp3] = self.take_profits;
        match direction {
            Direction::Long => {
                self.stop_loss < self.entry && self.entry < tp1 && tp1 < tp2 && tp2 < tp3
            }
            Direction::Short => {
                self.stop_loss > self.entry && self.entry > tp1 && tp1 > tp2 && tp2 > tp3
            }
            Direction::Neutral => false,
        }
    }
}

/// A scored opportunity for one instrument, produced by the scorer and
/// possibly revised by the verifier. Lives for at most one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalCandidate {
    pub symbol: String,
    pub direction: Direction,
    /// Accumulated long-side points (non-negative).
    pub long_score: f64,
    /// Accumulated short-side points (non-negative).
    pub short_score: f64,
    /// Confidence percentage, always within 0-100.
    pub confidence: f64,
    /// Price levels; None for neutral candidates.
    pub levels: Option<TradeLevels>,
    /// Named pass/fail conditions behind the verdict.
    pub reasons: Vec<String>,
}

impl SignalCandidate {
    /// A neutral candidate carrying only its rationale.
    pub fn neutral(symbol: String, long_score: f64, short_score: f64, reasons: Vec<String>) -> Self {
        Self {
            symbol,
            direction: Direction::Neutral,
            long_score,
            short_score,
            confidence: 0.0,
            levels: None,
            reasons,
        }
    }

    /// Whether this candidate proceeds past scoring.
    pub fn is_directional(&self) -> bool {
        self.direction != Direction::Neutral
    }

    /// Absolute margin between the winning and losing score.
    pub fn score_margin(&self) -> f64 {
        (self.long_score - self.short_score).abs()
    }

    /// Clamp confidence into 0-100 after an adjustment.
    pub fn clamp_confidence(&mut self) {
        self.confidence = self.confidence.clamp(0.0, 100.0);
    }
}

/// Outcome of the fine-timeframe confirmation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Fine timeframe agrees; confidence raised.
    Accept,
    /// Ambiguous fine timeframe; candidate kept with lowered confidence.
    Adjust,
    /// Fine timeframe strongly contradicts; candidate discarded.
    Reject,
}

/// One emitted signal, as recorded by the emission gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionRecord {
    pub signal_id: Uuid,
    pub symbol: String,
    pub direction: Direction,
    /// Unix timestamp (milliseconds) of emission.
    pub timestamp: i64,
}

/// Orchestrator state within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    FetchingCandidates,
    Scoring,
    Verifying,
    Ranking,
    Emitting,
}

impl ScanState {
    pub fn label(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::FetchingCandidates => "fetching_candidates",
            ScanState::Scoring => "scoring",
            ScanState::Verifying => "verifying",
            ScanState::Ranking => "ranking",
            ScanState::Emitting => "emitting",
        }
    }
}

/// Read-only snapshot of the last completed (or in-flight) cycle,
/// exposed through the status API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    /// Monotonic cycle counter since process start.
    pub cycle: u64,
    /// Unix timestamp (milliseconds) the cycle started.
    pub timestamp: i64,
    pub state: ScanState,
    pub instruments_scanned: usize,
    pub candidates_found: usize,
    pub signals_emitted: usize,
}

impl CycleSummary {
    pub fn empty() -> Self {
        Self {
            cycle: 0,
            timestamp: 0,
            state: ScanState::Idle,
            instruments_scanned: 0,
            candidates_found: 0,
            signals_emitted: 0,
        }
    }
}
