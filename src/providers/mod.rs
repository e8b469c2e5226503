pub mod caching;
pub mod exchange_rates;
pub mod rest_countries;
pub mod util;

pub use caching::RateCache;
pub use exchange_rates::OpenErApiProvider;
pub use rest_countries::RestCountriesProvider;
