//! Country records and the views handed out by the query paths.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

/// A country as delivered by the reference data source, reduced to the
/// fields we keep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCountry {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: u64,
    pub flag_url: Option<String>,
    /// First currency code listed by the source, if any.
    pub currency_code: Option<String>,
}

/// Stored country. `name` is unique ignoring case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: u64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

/// Normalised lookup key for a country name.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl CountryRecord {
    pub fn key(&self) -> String {
        name_key(&self.name)
    }
}

/// Currency code to rate-per-USD.
pub type RateTable = HashMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateSnapshot {
    pub rates: RateTable,
    pub captured_at: DateTime<Utc>,
}

/// Singleton row tracking the last successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub last_refreshed_at: DateTime<Utc>,
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn serialize_timestamp<S: serde::Serializer>(
    ts: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryView {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: u64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: String,
}

impl From<&CountryRecord> for CountryView {
    fn from(record: &CountryRecord) -> Self {
        CountryView {
            name: record.name.clone(),
            capital: record.capital.clone(),
            region: record.region.clone(),
            population: record.population,
            currency_code: record.currency_code.clone(),
            exchange_rate: record.exchange_rate,
            estimated_gdp: record.estimated_gdp,
            flag_url: record.flag_url.clone(),
            last_refreshed_at: format_timestamp(&record.last_refreshed_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    pub total_countries: usize,
    /// `None` until the first refresh completes.
    pub last_refreshed_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortMode {
    #[default]
    Natural,
    GdpDesc,
    GdpAsc,
}

impl Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SortMode::Natural => "",
                SortMode::GdpDesc => "gdp_desc",
                SortMode::GdpAsc => "gdp_asc",
            }
        )
    }
}

impl FromStr for SortMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" => Ok(SortMode::Natural),
            "gdp_desc" => Ok(SortMode::GdpDesc),
            "gdp_asc" => Ok(SortMode::GdpAsc),
            _ => Err(anyhow::anyhow!("Invalid sort mode: {}", s)),
        }
    }
}

/// Filter and ordering for a country listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: SortMode,
}

impl ListQuery {
    /// Distinct filter combinations map to distinct cache entries.
    pub fn cache_key(&self) -> String {
        format!(
            "countries_list_{}_{}_{}",
            self.region.as_deref().unwrap_or(""),
            self.currency.as_deref().unwrap_or(""),
            self.sort
        )
    }

    pub fn matches(&self, record: &CountryRecord) -> bool {
        let region_ok = self
            .region
            .as_deref()
            .is_none_or(|r| record.region.as_deref() == Some(r));
        let currency_ok = self
            .currency
            .as_deref()
            .is_none_or(|c| record.currency_code.as_deref() == Some(c));
        region_ok && currency_ok
    }

    /// Filters and orders `records` in place. Records without an estimate
    /// always sort after those with one.
    pub fn apply(&self, records: &mut Vec<CountryRecord>) {
        records.retain(|r| self.matches(r));
        match self.sort {
            SortMode::Natural => {}
            SortMode::GdpDesc => records.sort_by(|a, b| compare_gdp(a, b, true)),
            SortMode::GdpAsc => records.sort_by(|a, b| compare_gdp(a, b, false)),
        }
    }
}

fn compare_gdp(a: &CountryRecord, b: &CountryRecord, descending: bool) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.estimated_gdp, b.estimated_gdp) {
        (Some(x), Some(y)) => {
            let ord = x.total_cmp(&y);
            if descending { ord.reverse() } else { ord }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
