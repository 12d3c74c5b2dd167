use thiserror::Error;

/// Errors raised while scanning a single instrument or running a cycle.
///
/// Nothing here is fatal to the process: insufficient history, data
/// unavailability and computation problems skip one instrument, a missing
/// candidate list aborts one cycle, and a notification failure is logged
/// and the cycle continues.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("insufficient history for {symbol}: have {have} bars, need {need}")]
    InsufficientHistory {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("market data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("candidate list unavailable: {0}")]
    CandidateListUnavailable(String),

    #[error("indicator computation failed for {symbol}: {reason}")]
    Computation { symbol: String, reason: String },

    #[error("notification delivery failed: {0}")]
    Notification(String),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl ScanError {
    /// Whether this error aborts the whole cycle rather than one instrument.
    pub fn aborts_cycle(&self) -> bool {
        matches!(self, ScanError::CandidateListUnavailable(_))
    }
}

/// Invalid configuration detected at startup. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("failed to parse {name}: {value:?}")]
    Unparseable { name: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ScanError>;
