//! Market data adapters, one per vendor, selected at startup

pub mod binance;
pub mod twelve_data;

pub use binance::BinanceClient;
pub use twelve_data::TwelveDataClient;

use async_trait::async_trait;
use reqwest::Client;
use std::str::FromStr;

use crate::domain::price::PriceSource;
use crate::shared::config::Config;
use crate::shared::errors::{ConfigError, FetchError, ParseFailure};

/// Supported vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Binance,
    TwelveData,
}

impl FromStr for DataSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "binance" => Ok(DataSource::Binance),
            "twelvedata" => Ok(DataSource::TwelveData),
            other => Err(ConfigError::Invalid(format!("unknown data source {:?}", other))),
        }
    }
}

/// The configured vendor client
pub enum MarketDataClient {
    Binance(BinanceClient),
    TwelveData(TwelveDataClient),
}

impl MarketDataClient {
    pub fn from_config(cfg: &Config, http_client: Client) -> Result<Self, ConfigError> {
        let client = match cfg.trading.data_source.parse::<DataSource>()? {
            DataSource::Binance => MarketDataClient::Binance(BinanceClient::new(
                http_client,
                cfg.binance.base_url.clone(),
                cfg.binance.api_key.clone(),
            )),
            DataSource::TwelveData => MarketDataClient::TwelveData(TwelveDataClient::new(
                http_client,
                cfg.twelvedata.base_url.clone(),
                cfg.twelvedata.api_key.clone(),
            )),
        };
        Ok(client)
    }

    fn inner(&self) -> &dyn PriceSource {
        match self {
            MarketDataClient::Binance(client) => client,
            MarketDataClient::TwelveData(client) => client,
        }
    }
}

#[async_trait]
impl PriceSource for MarketDataClient {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    async fn fetch_closes(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<f64>, FetchError> {
        self.inner().fetch_closes(symbol, interval, count).await
    }

    async fn fetch_current_price(&self, symbol: &str) -> Result<f64, FetchError> {
        self.inner().fetch_current_price(symbol).await
    }
}

/// Turn a non-2xx response into a `FetchError::Status` carrying the body
pub(crate) async fn check_status(
    vendor: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(FetchError::Status {
        vendor,
        status: status.as_u16(),
        body,
    })
}

pub(crate) fn parse_price(vendor: &'static str, raw: &str) -> Result<f64, FetchError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| FetchError::parse(vendor, ParseFailure::Number(raw.to_string())))
}
