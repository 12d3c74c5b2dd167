//! Core pipeline services.

pub mod cache;
pub mod indicators;
pub mod notifier;
pub mod rate_limit;
pub mod scanner;
pub mod scorer;
pub mod verifier;

pub use cache::Cache;
pub use notifier::TelegramNotifier;
pub use rate_limit::{DenyReason, EmissionGate, GateStats};
pub use scanner::Scanner;
pub use scorer::{AdvisoryModel, Scorer};
