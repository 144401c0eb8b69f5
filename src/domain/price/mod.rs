//! Price domain - the market data capability the monitor polls

use async_trait::async_trait;

use crate::shared::errors::FetchError;

/// Uniform view over a vendor's market data API
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Vendor name used in logs
    fn name(&self) -> &'static str;

    /// Up to `count` most recent closing prices, oldest first
    async fn fetch_closes(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<f64>, FetchError>;

    /// Latest traded / quoted price
    async fn fetch_current_price(&self, symbol: &str) -> Result<f64, FetchError>;
}
