//! Scanner status surface.

use crate::services::GateStats;
use crate::types::CycleSummary;
use crate::AppState;
use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(flatten)]
    cycle: CycleSummary,
    gate: GateStats,
}

/// Read-only snapshot of the scanner: the current or last completed
/// cycle plus the emission gate counters.
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        cycle: state.scanner.status().await,
        gate: state.scanner.gate_stats().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/status", get(status))
}
