use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::price::PriceSource;
use crate::shared::errors::{FetchError, ParseFailure};
use super::{check_status, parse_price};

const VENDOR: &str = "binance";
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
/// Hard cap of the klines endpoint
const MAX_KLINES: usize = 1000;
/// Position of the close price inside a kline row
const CLOSE_INDEX: usize = 4;

/// Response of /api/v3/ticker/price
#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

/// Binance spot REST client
pub struct BinanceClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BinanceClient {
    pub fn new(http_client: Client, base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http_client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("X-MBX-APIKEY", key);
        }
        let response = request.send().await?;
        check_status(VENDOR, response).await
    }
}

#[async_trait]
impl PriceSource for BinanceClient {
    fn name(&self) -> &'static str {
        VENDOR
    }

    async fn fetch_closes(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<f64>, FetchError> {
        let limit = count.min(MAX_KLINES);
        let response = self
            .get(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let rows: Vec<Vec<Value>> = response.json().await?;
        let closes = parse_klines(&rows)?;
        if closes.is_empty() {
            return Err(FetchError::EmptySeries {
                vendor: VENDOR,
                symbol: symbol.to_string(),
            });
        }
        if closes.len() < count {
            debug!("{} returned {} of {} requested closes for {}", VENDOR, closes.len(), count, symbol);
        }
        Ok(closes)
    }

    async fn fetch_current_price(&self, symbol: &str) -> Result<f64, FetchError> {
        let response = self
            .get("/api/v3/ticker/price", &[("symbol", symbol.to_string())])
            .await?;
        let ticker: TickerPrice = response.json().await?;
        parse_price(VENDOR, &ticker.price)
    }
}

/// Close prices out of kline rows, already oldest first
fn parse_klines(rows: &[Vec<Value>]) -> Result<Vec<f64>, FetchError> {
    rows.iter()
        .map(|row| {
            let close = row
                .get(CLOSE_INDEX)
                .ok_or_else(|| FetchError::parse(VENDOR, ParseFailure::MissingField("close")))?;
            match close {
                Value::String(s) => parse_price(VENDOR, s),
                Value::Number(n) => n
                    .as_f64()
                    .ok_or_else(|| FetchError::parse(VENDOR, ParseFailure::Number(n.to_string()))),
                other => Err(FetchError::parse(VENDOR, ParseFailure::Number(other.to_string()))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_klines() {
        let rows: Vec<Vec<Value>> = serde_json::from_value(json!([
            [1499040000000u64, "0.01634790", "0.80000000", "0.01575800", "0.01577100", "148976.11427815"],
            [1499040060000u64, "0.01577100", "0.80000000", "0.01575800", "0.01600000", "1.0"]
        ]))
        .unwrap();
        assert_eq!(parse_klines(&rows).unwrap(), vec![0.015771, 0.016]);
    }

    #[test]
    fn test_parse_klines_short_row() {
        let rows: Vec<Vec<Value>> = serde_json::from_value(json!([[1, "1.0", "2.0"]])).unwrap();
        assert!(matches!(
            parse_klines(&rows),
            Err(FetchError::Parse { source: ParseFailure::MissingField("close"), .. })
        ));
    }

    #[test]
    fn test_parse_klines_bad_number() {
        let rows: Vec<Vec<Value>> =
            serde_json::from_value(json!([[1, "1.0", "2.0", "0.5", "n/a", "3"]])).unwrap();
        assert!(matches!(
            parse_klines(&rows),
            Err(FetchError::Parse { source: ParseFailure::Number(_), .. })
        ));
    }

    #[test]
    fn test_empty_api_key_is_dropped() {
        let client = BinanceClient::new(Client::new(), None, Some(String::new()));
        assert!(client.api_key.is_none());
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }
}
