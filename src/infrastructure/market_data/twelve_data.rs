use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::domain::price::PriceSource;
use crate::shared::errors::{FetchError, ParseFailure};
use super::{check_status, parse_price};

const VENDOR: &str = "twelvedata";
pub const DEFAULT_BASE_URL: &str = "https://api.twelvedata.com";
/// Public key with heavily limited quota
const DEMO_API_KEY: &str = "demo";
const MAX_OUTPUT_SIZE: usize = 5000;

/// Response of /time_series; errors come back as 200 with `status = "error"`
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    status: Option<String>,
    message: Option<String>,
    values: Option<Vec<TimeSeriesBar>>,
}

#[derive(Debug, Deserialize)]
struct TimeSeriesBar {
    close: String,
}

/// Response of /quote
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    status: Option<String>,
    message: Option<String>,
    close: Option<String>,
}

/// Twelve Data REST client for forex / metals
pub struct TwelveDataClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl TwelveDataClient {
    pub fn new(http_client: Client, base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: api_key
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| DEMO_API_KEY.to_string()),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(query)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;
        check_status(VENDOR, response).await
    }
}

/// Map exchange-style interval names onto Twelve Data's; unknown names pass through
pub fn map_interval(interval: &str) -> &str {
    match interval {
        "1m" => "1min",
        "5m" => "5min",
        "15m" => "15min",
        "30m" => "30min",
        "1h" => "1h",
        "4h" => "4h",
        "1d" => "1day",
        other => other,
    }
}

fn api_error(status: Option<&str>, message: Option<String>) -> Option<FetchError> {
    if status == Some("error") {
        Some(FetchError::Api {
            vendor: VENDOR,
            message: message.unwrap_or_else(|| "unknown error".to_string()),
        })
    } else {
        None
    }
}

/// Closes oldest first; the API lists newest first
fn parse_time_series(response: TimeSeriesResponse, symbol: &str) -> Result<Vec<f64>, FetchError> {
    if let Some(err) = api_error(response.status.as_deref(), response.message) {
        return Err(err);
    }
    let values = response.values.unwrap_or_default();
    if values.is_empty() {
        return Err(FetchError::EmptySeries {
            vendor: VENDOR,
            symbol: symbol.to_string(),
        });
    }
    values
        .iter()
        .rev()
        .map(|bar| parse_price(VENDOR, &bar.close))
        .collect()
}

fn parse_quote(response: QuoteResponse) -> Result<f64, FetchError> {
    if let Some(err) = api_error(response.status.as_deref(), response.message) {
        return Err(err);
    }
    let close = response
        .close
        .ok_or_else(|| FetchError::parse(VENDOR, ParseFailure::MissingField("close")))?;
    parse_price(VENDOR, &close)
}

#[async_trait]
impl PriceSource for TwelveDataClient {
    fn name(&self) -> &'static str {
        VENDOR
    }

    async fn fetch_closes(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<f64>, FetchError> {
        let response = self
            .get(
                "/time_series",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", map_interval(interval).to_string()),
                    ("outputsize", count.min(MAX_OUTPUT_SIZE).to_string()),
                ],
            )
            .await?;
        let closes = parse_time_series(response.json().await?, symbol)?;
        if closes.len() < count {
            debug!("{} returned {} of {} requested closes for {}", VENDOR, closes.len(), count, symbol);
        }
        Ok(closes)
    }

    async fn fetch_current_price(&self, symbol: &str) -> Result<f64, FetchError> {
        let response = self.get("/quote", &[("symbol", symbol.to_string())]).await?;
        parse_quote(response.json().await?)
    }
}
