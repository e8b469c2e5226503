use crate::core::country::RawCountry;
use crate::core::error::{AppError, AppResult};
use crate::core::source::CountrySource;
use crate::providers::util::fetch_text;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const SOURCE: &str = "countries";
const FIELDS: &str = "name,capital,region,population,flag,currencies";

/// Client for the REST Countries v2 API.
pub struct RestCountriesProvider {
    base_url: String,
    timeout: Duration,
}

impl RestCountriesProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        RestCountriesProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

/// Every field may be missing or `null` upstream; both read as empty.
#[derive(Deserialize, Debug)]
struct CountryItem {
    name: Option<String>,
    capital: Option<String>,
    region: Option<String>,
    population: Option<u64>,
    flag: Option<String>,
    currencies: Option<Vec<CurrencyItem>>,
}

#[derive(Deserialize, Debug)]
struct CurrencyItem {
    code: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<CountryItem> for RawCountry {
    fn from(item: CountryItem) -> Self {
        let currency_code = item
            .currencies
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| non_empty(c.code));
        RawCountry {
            name: item.name.unwrap_or_default(),
            capital: non_empty(item.capital),
            region: non_empty(item.region),
            population: item.population.unwrap_or_default(),
            flag_url: non_empty(item.flag),
            currency_code,
        }
    }
}

/// Decodes a country listing. Any shape mismatch fails the whole payload.
fn parse_countries(text: &str) -> AppResult<Vec<RawCountry>> {
    let items: Vec<CountryItem> = serde_json::from_str(text).map_err(|e| {
        AppError::SourceDataInvalid(format!("Failed to parse country listing: {e}"))
    })?;
    Ok(items.into_iter().map(RawCountry::from).collect())
}

#[async_trait]
impl CountrySource for RestCountriesProvider {
    #[instrument(name = "CountriesFetch", skip(self), fields(base_url = %self.base_url))]
    async fn fetch_countries(&self) -> AppResult<Vec<RawCountry>> {
        let url = format!("{}/v2/all?fields={}", self.base_url, FIELDS);
        let text = fetch_text(SOURCE, &url, self.timeout).await?;
        let countries = parse_countries(&text)?;
        debug!("Fetched {} countries", countries.len());
        Ok(countries)
    }
}
