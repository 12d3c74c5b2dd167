use crate::error::ConfigError;
use std::env;
use std::time::Duration;

/// Application configuration.
///
/// All values are plain numbers/durations read from the environment with
/// sensible defaults. An inconsistent configuration is fatal at startup:
/// `validate()` must pass before the scanner runs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address for the status API.
    pub host: String,
    /// Server port for the status API.
    pub port: u16,
    /// KuCoin API key (optional, public endpoints work without).
    pub kucoin_api_key: Option<String>,
    /// Telegram bot token (optional, signals are logged only if absent).
    pub telegram_bot_token: Option<String>,
    /// Telegram chat id to deliver signals to.
    pub telegram_chat_id: Option<String>,
    /// Minimum 24h quote volume (USDT) for a pair to enter the scan universe.
    pub min_quote_volume: f64,
    /// Seconds between scan cycles.
    pub scan_interval_secs: u64,
    /// Maximum signals emitted in any rolling 60-minute window.
    pub max_signals_per_hour: usize,
    /// Minimum confidence (0-100) required to emit a signal.
    pub min_confidence: f64,
    /// Minimum TP1 reward:risk ratio; candidates below it become neutral.
    pub min_reward_risk: f64,
    /// Minutes before the same symbol+direction may be emitted again.
    pub cooldown_minutes: u64,
    /// Cap on instruments analyzed per cycle.
    pub max_symbols_per_scan: usize,
    /// Bound on concurrent per-symbol fetch/score operations.
    pub fetch_concurrency: usize,
    /// Timeout for any single market data request.
    pub request_timeout_secs: u64,
    /// How many top-ranked candidates may be emitted per cycle.
    pub top_k: usize,
}

/// An absent or empty variable falls back to the default; a variable
/// that is set but does not parse is a startup error, not a silent
/// fallback.
fn env_or<T: std::str::FromStr>(
    name: &'static str,
    default: T,
) -> std::result::Result<T, ConfigError> {
    match env::var(name).ok().filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Unparseable { name, value: raw }),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 3900)?,
            kucoin_api_key: env::var("KUCOIN_API_KEY").ok().filter(|k| !k.is_empty()),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok().filter(|c| !c.is_empty()),
            min_quote_volume: env_or("MIN_QUOTE_VOLUME", 100_000.0)?,
            scan_interval_secs: env_or("SCAN_INTERVAL_SECS", 300)?,
            max_signals_per_hour: env_or("MAX_SIGNALS_PER_HOUR", 5)?,
            min_confidence: env_or("MIN_CONFIDENCE", 70.0)?,
            min_reward_risk: env_or("MIN_REWARD_RISK", 1.0)?,
            cooldown_minutes: env_or("COOLDOWN_MINUTES", 60)?,
            max_symbols_per_scan: env_or("MAX_SYMBOLS_PER_SCAN", 30)?,
            fetch_concurrency: env_or("FETCH_CONCURRENCY", 4)?,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 10)?,
            top_k: env_or("TOP_K", 1)?,
        })
    }

    /// Reject configurations the scanner must not run with.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(ConfigError::InvalidValue {
                name: "MIN_CONFIDENCE",
                reason: format!("{} is outside 0-100", self.min_confidence),
            });
        }
        if self.min_reward_risk <= 0.0 || !self.min_reward_risk.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "MIN_REWARD_RISK",
                reason: format!("{} must be a positive ratio", self.min_reward_risk),
            });
        }
        if self.max_signals_per_hour == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_SIGNALS_PER_HOUR",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "SCAN_INTERVAL_SECS",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FETCH_CONCURRENCY",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_symbols_per_scan == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_SYMBOLS_PER_SCAN",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                name: "TOP_K",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.min_quote_volume < 0.0 || !self.min_quote_volume.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "MIN_QUOTE_VOLUME",
                reason: format!("{} must be non-negative", self.min_quote_volume),
            });
        }
        Ok(())
    }

    /// Timeout applied to every outbound market data request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Cooldown window in milliseconds.
    pub fn cooldown_ms(&self) -> i64 {
        self.cooldown_minutes as i64 * 60_000
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3900,
            kucoin_api_key: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            min_quote_volume: 100_000.0,
            scan_interval_secs: 300,
            max_signals_per_hour: 5,
            min_confidence: 70.0,
            min_reward_risk: 1.0,
            cooldown_minutes: 60,
            max_symbols_per_scan: 30,
            fetch_concurrency: 4,
            request_timeout_secs: 10,
            top_k: 1,
        }
    }
}
