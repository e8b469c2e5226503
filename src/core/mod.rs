//! Core domain types, abstractions and the merge logic

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod country;
pub mod error;
pub mod log;
pub mod source;
pub mod store;

// Re-export main types for cleaner imports
pub use cache::Cache;
pub use country::{
    CountryRecord, CountryView, ExchangeRateSnapshot, ListQuery, RateTable, RawCountry, SortMode,
    StatusRecord, StatusView,
};
pub use error::{AppError, AppResult};
pub use source::{CountrySource, RateSource};
pub use store::CountryStore;
