//! Telegram signal delivery.
//!
//! Delivery failure is never fatal to a scan cycle: the signal is
//! "detected but undelivered", logged, and not retried until the
//! instrument qualifies again.

use crate::error::ScanError;
use crate::types::{Direction, SignalCandidate};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Telegram Bot API notifier for emitted signals.
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent("Specter/1.0")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            bot_token,
            chat_id,
        }
    }

    /// Deliver one emitted signal.
    pub async fn send_signal(
        &self,
        candidate: &SignalCandidate,
        signal_id: Uuid,
    ) -> Result<(), ScanError> {
        let text = format_signal_message(candidate, signal_id);
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_URL, self.bot_token);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            .map_err(|e| ScanError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::Notification(format!(
                "telegram returned {}: {}",
                status,
                excerpt(&body)
            )));
        }

        info!("Signal {} delivered for {}", signal_id, candidate.symbol);
        Ok(())
    }
}

/// Leading slice of an error body for the error message, cut at a char
/// boundary. Telegram error descriptions can be localized multi-byte text.
fn excerpt(text: &str) -> &str {
    let mut end = text.len().min(200);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Render the notification payload for one signal.
pub fn format_signal_message(candidate: &SignalCandidate, signal_id: Uuid) -> String {
    let direction_marker = match candidate.direction {
        Direction::Long => "🟢 LONG",
        Direction::Short => "🔴 SHORT",
        Direction::Neutral => "⚪ NEUTRAL",
    };

    let mut lines = vec![
        format!("{} *{}*", direction_marker, candidate.symbol),
        format!("Confidence: {:.1}%", candidate.confidence),
    ];

    if let Some(levels) = &candidate.levels {
        lines.push(format!("Entry: {:.6}", levels.entry));
        lines.push(format!("Stop: {:.6}", levels.stop_loss));
        for (i, tp) in levels.take_profits.iter().enumerate() {
            lines.push(format!("TP{}: {:.6}", i + 1, tp));
        }
    }

    if !candidate.reasons.is_empty() {
        lines.push(format!("Rationale: {}", candidate.reasons.join("; ")));
    }
    lines.push(format!("Signal ID: `{}`", signal_id));

    lines.join("\n")
}
