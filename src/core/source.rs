//! Upstream data sources

use crate::core::country::{ExchangeRateSnapshot, RawCountry};
use crate::core::error::AppResult;
use async_trait::async_trait;

#[async_trait]
pub trait CountrySource: Send + Sync {
    async fn fetch_countries(&self) -> AppResult<Vec<RawCountry>>;
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Returns the full rate table stamped with the capture time.
    async fn fetch_rates(&self) -> AppResult<ExchangeRateSnapshot>;
}
