//! Persistence boundary for countries and the refresh status.

use crate::core::country::{CountryRecord, StatusRecord};
use crate::core::error::AppResult;
use async_trait::async_trait;

/// Durable storage of country records. Lookups by name ignore case.
#[async_trait]
pub trait CountryStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<CountryRecord>>;

    /// Inserts or replaces the record stored under the record's name.
    async fn save(&self, record: &CountryRecord) -> AppResult<()>;

    /// All records in natural (name) order.
    async fn list(&self) -> AppResult<Vec<CountryRecord>>;

    /// Returns `false` when nothing matched.
    async fn delete_by_name(&self, name: &str) -> AppResult<bool>;

    async fn count(&self) -> AppResult<usize>;

    async fn status(&self) -> AppResult<Option<StatusRecord>>;

    async fn save_status(&self, status: &StatusRecord) -> AppResult<()>;
}
