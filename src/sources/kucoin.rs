use crate::error::ScanError;
use crate::services::Cache;
use crate::sources::MarketData;
use crate::types::{Candle, CandidateCoin, Timeframe};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const KUCOIN_API_URL: &str = "https://api.kucoin.com/api/v1";
const TICKER_CACHE_KEY: &str = "all_tickers";
const TICKER_CACHE_TTL: Duration = Duration::from_secs(30);
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Statuses worth one retry: server faults and rate limiting, which a
/// short backoff can outwait.
fn retryable_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}

/// Leading slice of an error body for logging, cut at a char boundary.
fn excerpt(text: &str) -> &str {
    let mut end = text.len().min(200);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// KuCoin all tickers response envelope.
#[derive(Debug, Deserialize)]
struct KuCoinResponse<T> {
    code: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct KuCoinTickers {
    ticker: Vec<KuCoinTicker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KuCoinTicker {
    symbol: String,
    last: Option<String>,
    vol_value: Option<String>,
}

/// KuCoin public REST client.
///
/// Works without credentials; the optional API key only raises rate
/// limits. A short-TTL cache fronts the ticker endpoint so retries and
/// closely-spaced cycles do not refetch the whole universe.
pub struct KuCoinClient {
    client: Client,
    api_key: Option<String>,
    ticker_cache: Cache<Vec<CandidateCoin>>,
}

impl KuCoinClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent("Specter/1.0")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            ticker_cache: Cache::new(TICKER_CACHE_TTL),
        }
    }

    /// GET with one retry after a short backoff on transport errors.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<KuCoinResponse<T>, ScanError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self.client.get(url);
            if let Some(ref key) = self.api_key {
                request = request.header("KC-API-KEY", key);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json::<KuCoinResponse<T>>().await?);
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    warn!("KuCoin API returned {}: {}", status, excerpt(&text));
                    if attempt > 1 || !retryable_status(status) {
                        return Err(ScanError::DataUnavailable {
                            symbol: String::new(),
                            reason: format!("KuCoin API error: {status}"),
                        });
                    }
                }
                Err(e) => {
                    if attempt > 1 {
                        return Err(e.into());
                    }
                    debug!("KuCoin request failed, retrying: {}", e);
                }
            }

            tokio::time::sleep(RETRY_BACKOFF).await;
        }
    }

    async fn fetch_tickers(&self) -> Result<Vec<CandidateCoin>, ScanError> {
        let url = format!("{KUCOIN_API_URL}/market/allTickers");
        let response: KuCoinResponse<KuCoinTickers> = self
            .get_json(&url)
            .await
            .map_err(|e| ScanError::CandidateListUnavailable(e.to_string()))?;

        if response.code != "200000" {
            return Err(ScanError::CandidateListUnavailable(format!(
                "KuCoin error code {}",
                response.code
            )));
        }

        let tickers = response
            .data
            .ok_or_else(|| ScanError::CandidateListUnavailable("empty ticker payload".into()))?
            .ticker;

        let mut coins: Vec<CandidateCoin> = tickers
            .into_iter()
            .filter(|t| t.symbol.ends_with("-USDT"))
            .filter_map(|t| {
                let quote_volume: f64 = t.vol_value.as_ref()?.parse().ok()?;
                let last_price: f64 = t.last.as_ref()?.parse().ok()?;
                if last_price > 0.0 {
                    Some(CandidateCoin {
                        symbol: t.symbol,
                        quote_volume,
                        last_price,
                    })
                } else {
                    None
                }
            })
            .collect();

        coins.sort_by(|a, b| {
            b.quote_volume
                .partial_cmp(&a.quote_volume)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(coins)
    }

    /// Parse one kline row. KuCoin returns
    /// [time, open, close, high, low, volume, turnover] as strings,
    /// newest first, with time in epoch seconds.
    fn parse_kline_row(symbol: &str, row: &[String]) -> Result<Candle, ScanError> {
        let field = |i: usize| -> Result<f64, ScanError> {
            row.get(i)
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| ScanError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: format!("malformed kline field {i}"),
                })
        };

        Ok(Candle {
            time: field(0)? as i64 * 1000,
            open: field(1)?,
            close: field(2)?,
            high: field(3)?,
            low: field(4)?,
            volume: field(5)?,
        })
    }
}

impl MarketData for KuCoinClient {
    async fn top_volume_pairs(
        &self,
        min_quote_volume: f64,
    ) -> Result<Vec<CandidateCoin>, ScanError> {
        let coins = match self.ticker_cache.get(TICKER_CACHE_KEY) {
            Some(cached) => cached,
            None => {
                let fetched = self.fetch_tickers().await?;
                self.ticker_cache
                    .set(TICKER_CACHE_KEY.to_string(), fetched.clone());
                fetched
            }
        };

        Ok(coins
            .into_iter()
            .filter(|c| c.quote_volume >= min_quote_volume)
            .collect())
    }

    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ScanError> {
        let now = Utc::now().timestamp();
        let start_at = now - (limit as i64 + 1) * timeframe.seconds();
        let url = format!(
            "{KUCOIN_API_URL}/market/candles?type={}&symbol={}&startAt={}&endAt={}",
            timeframe.kucoin_type(),
            symbol,
            start_at,
            now
        );

        let response: KuCoinResponse<Vec<Vec<String>>> = self.get_json(&url).await.map_err(
            |e| match e {
                ScanError::DataUnavailable { reason, .. } => ScanError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason,
                },
                other => other,
            },
        )?;

        if response.code != "200000" {
            return Err(ScanError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("KuCoin error code {}", response.code),
            });
        }

        let mut rows = response.data.unwrap_or_default();
        // KuCoin returns klines newest first
        rows.reverse();

        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            candles.push(Self::parse_kline_row(symbol, row)?);
        }

        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }

        debug!(
            "Fetched {} {} candles for {}",
            candles.len(),
            timeframe,
            symbol
        );
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_deserialization() {
        let json = r#"{
            "symbol": "BTC-USDT",
            "last": "43500.50",
            "volValue": "2175000000"
        }"#;

        let ticker: KuCoinTicker = serde_json::from_str(json).unwrap();
        assert_eq!(ticker.symbol, "BTC-USDT");
        assert_eq!(ticker.last, Some("43500.50".to_string()));
        assert_eq!(ticker.vol_value, Some("2175000000".to_string()));
    }

    #[test]
    fn test_ticker_minimal() {
        let json = r#"{"symbol": "ETH-USDT"}"#;
        let ticker: KuCoinTicker = serde_json::from_str(json).unwrap();
        assert!(ticker.last.is_none());
        assert!(ticker.vol_value.is_none());
    }

    #[test]
    fn test_response_envelope() {
        let json = r#"{
            "code": "200000",
            "data": {
                "ticker": [
                    {"symbol": "BTC-USDT", "last": "43500.50", "volValue": "2175000000"}
                ]
            }
        }"#;

        let response: KuCoinResponse<KuCoinTickers> = serde_json::from_str(json).unwrap();
        assert_eq!(response.code, "200000");
        assert_eq!(response.data.unwrap().ticker.len(), 1);
    }

    #[test]
    fn test_error_envelope() {
        let json = r#"{"code": "400001", "data": null}"#;
        let response: KuCoinResponse<KuCoinTickers> = serde_json::from_str(json).unwrap();
        assert_eq!(response.code, "400001");
        assert!(response.data.is_none());
    }

    #[test]
    fn test_parse_kline_row() {
        let row: Vec<String> = ["1700000000", "100.5", "101.2", "102.0", "99.8", "1234.5", "0"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let candle = KuCoinClient::parse_kline_row("BTC-USDT", &row).unwrap();
        assert_eq!(candle.time, 1_700_000_000_000);
        assert_eq!(candle.open, 100.5);
        assert_eq!(candle.close, 101.2);
        assert_eq!(candle.high, 102.0);
        assert_eq!(candle.low, 99.8);
        assert_eq!(candle.volume, 1234.5);
    }

    #[test]
    fn test_retryable_statuses() {
        use reqwest::StatusCode;
        assert!(retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!retryable_status(StatusCode::BAD_REQUEST));
        assert!(!retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        // A multi-byte char straddling the 200-byte mark must not panic
        let text = format!("{}é{}", "x".repeat(199), "y".repeat(50));
        assert!(!text.is_char_boundary(200));
        let cut = excerpt(&text);
        assert!(cut.len() <= 200);
        assert!(text.starts_with(cut));

        let short = "err";
        assert_eq!(excerpt(short), "err");
    }

    #[test]
    fn test_parse_kline_row_malformed() {
        let row: Vec<String> = ["1700000000", "not-a-number"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = KuCoinClient::parse_kline_row("BTC-USDT", &row).unwrap_err();
        assert!(matches!(err, ScanError::DataUnavailable { .. }));
    }
}
