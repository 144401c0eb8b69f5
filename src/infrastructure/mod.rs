//! Infrastructure layer - vendor market data clients and notification transports

pub mod market_data;
pub mod notifiers;

pub use market_data::{DataSource, MarketDataClient};
pub use notifiers::{build_fanout, Notifier};

use reqwest::Client;
use std::time::Duration;

/// Shared HTTP client; every request is bounded by `timeout`
pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("bandwatch/", env!("CARGO_PKG_VERSION")))
        .build()
}
