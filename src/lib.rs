//! Specter - market signal detection and confirmation pipeline.
//!
//! Scans a volume-ranked universe of KuCoin USDT pairs on a fixed
//! interval, scores each instrument from a coarse-timeframe indicator
//! snapshot, confirms survivors against fresh fine-timeframe candles,
//! and emits the top-ranked signals through a rate-limited gate.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

use config::Config;
use services::Scanner;
use sources::KuCoinClient;
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scanner: Arc<Scanner<KuCoinClient>>,
}
