//! Signal emission gate.
//!
//! Owns the append-only emission log and makes the final allow/deny call
//! for every candidate: a rolling 60-minute emission cap plus a
//! per-symbol-per-direction cooldown that suppresses duplicate
//! notifications for an unresolved signal across consecutive cycles.

use crate::types::{Direction, EmissionRecord};
use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

/// Rolling window for the emission cap.
pub const WINDOW_MS: i64 = 60 * 60 * 1000;

/// Why a candidate was denied emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The rolling hourly budget is exhausted.
    HourlyLimit,
    /// Same symbol+direction emitted within the cooldown window.
    Cooldown,
}

/// Gate counters for the status surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStats {
    pub emitted_last_hour: usize,
    pub max_signals_per_hour: usize,
    pub total_emitted: u64,
}

/// The emission gate. Single-writer: the orchestrator serializes all
/// calls through one exclusively-owned instance.
pub struct EmissionGate {
    max_per_hour: usize,
    cooldown_ms: i64,
    /// Emissions within the current window, oldest first.
    window: VecDeque<EmissionRecord>,
    total_emitted: u64,
}

impl EmissionGate {
    /// A fresh gate with an empty log.
    pub fn new(max_per_hour: usize, cooldown_ms: i64) -> Self {
        Self {
            max_per_hour,
            cooldown_ms,
            window: VecDeque::new(),
            total_emitted: 0,
        }
    }

    /// Decide emission for a candidate at `now_ms`. On allow, the record
    /// is appended and the new signal id returned; on deny the candidate
    /// is simply dropped for this cycle.
    pub fn try_emit(
        &mut self,
        symbol: &str,
        direction: Direction,
        now_ms: i64,
    ) -> Result<Uuid, DenyReason> {
        self.prune(now_ms);

        // The deque may hold records past the hour when the cooldown
        // horizon is longer; only those inside the window count.
        if self.emitted_in_window(now_ms) >= self.max_per_hour {
            return Err(DenyReason::HourlyLimit);
        }

        let in_cooldown = self.window.iter().any(|r| {
            r.symbol == symbol
                && r.direction == direction
                && now_ms - r.timestamp < self.cooldown_ms
        });
        if in_cooldown {
            return Err(DenyReason::Cooldown);
        }

        let signal_id = Uuid::new_v4();
        self.window.push_back(EmissionRecord {
            signal_id,
            symbol: symbol.to_string(),
            direction,
            timestamp: now_ms,
        });
        self.total_emitted += 1;
        Ok(signal_id)
    }

    /// Drop records that have aged out of both the rolling window and
    /// the cooldown horizon.
    fn prune(&mut self, now_ms: i64) {
        let horizon = WINDOW_MS.max(self.cooldown_ms);
        while let Some(front) = self.window.front() {
            if now_ms - front.timestamp >= horizon {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Emissions inside the rolling window at `now_ms`.
    pub fn emitted_in_window(&self, now_ms: i64) -> usize {
        self.window
            .iter()
            .filter(|r| now_ms - r.timestamp < WINDOW_MS)
            .count()
    }

    pub fn stats(&self, now_ms: i64) -> GateStats {
        GateStats {
            emitted_last_hour: self.emitted_in_window(now_ms),
            max_signals_per_hour: self.max_per_hour,
            total_emitted: self.total_emitted,
        }
    }
}
