//! Merges raw country data with exchange rates into stored records.
use crate::core::country::{CountryRecord, RateTable, RawCountry, name_key};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;

/// Bounds of the GDP noise multiplier, `[low, high)`.
pub const GDP_MULTIPLIER_RANGE: (f64, f64) = (1000.0, 2000.0);

/// Source of the per-merge multiplier used in the GDP estimate.
pub trait GdpMultiplier: Send + Sync {
    /// Returns a value in `GDP_MULTIPLIER_RANGE`.
    fn sample(&self) -> f64;
}

/// Draws uniformly from `GDP_MULTIPLIER_RANGE` on every call, so repeated
/// refreshes with unchanged inputs still move the estimate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomMultiplier;

impl GdpMultiplier for RandomMultiplier {
    fn sample(&self) -> f64 {
        let (low, high) = GDP_MULTIPLIER_RANGE;
        rand::thread_rng().gen_range(low..high)
    }
}

/// Always returns the same multiplier.
#[derive(Debug, Clone, Copy)]
pub struct FixedMultiplier(pub f64);

impl GdpMultiplier for FixedMultiplier {
    fn sample(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteIntent {
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub record: CountryRecord,
    pub intent: WriteIntent,
}

/// Records with a blank name (empty or whitespace only) or no population
/// are dropped before merging.
pub fn should_skip(raw: &RawCountry) -> bool {
    raw.name.trim().is_empty() || raw.population == 0
}

/// Resolves `(exchange_rate, estimated_gdp)` for a raw record.
///
/// * no currency code: `(None, Some(0.0))`
/// * code without a positive rate: `(None, None)`
/// * code with a positive rate: `(Some(rate), Some(population * m / rate))`
pub fn resolve_gdp(
    raw: &RawCountry,
    rates: &RateTable,
    multiplier: &dyn GdpMultiplier,
) -> (Option<f64>, Option<f64>) {
    let Some(code) = raw.currency_code.as_deref() else {
        return (None, Some(0.0));
    };
    match rates.get(code) {
        Some(&rate) if rate > 0.0 => {
            let gdp = raw.population as f64 * multiplier.sample() / rate;
            (Some(rate), Some(gdp))
        }
        _ => {
            debug!(currency = code, country = %raw.name, "No usable rate for currency");
            (None, None)
        }
    }
}

/// Builds the record to persist for `raw`, overwriting `existing` in place
/// when the name is already known.
///
/// `refreshed_at` is the batch start time, shared by every record of a
/// refresh.
pub fn merge(
    raw: &RawCountry,
    rates: &RateTable,
    existing: Option<CountryRecord>,
    refreshed_at: DateTime<Utc>,
    multiplier: &dyn GdpMultiplier,
) -> Merged {
    let (exchange_rate, estimated_gdp) = resolve_gdp(raw, rates, multiplier);

    let key = name_key(&raw.name);
    let (mut record, intent) = match existing {
        Some(record) if record.key() == key => (record, WriteIntent::Update),
        _ => (
            CountryRecord {
                name: raw.name.clone(),
                capital: None,
                region: None,
                population: raw.population,
                currency_code: None,
                exchange_rate: None,
                estimated_gdp: None,
                flag_url: None,
                last_refreshed_at: refreshed_at,
            },
            WriteIntent::Create,
        ),
    };

    // Absent values clear whatever the previous refresh stored.
    record.name = raw.name.clone();
    record.capital = raw.capital.clone();
    record.region = raw.region.clone();
    record.population = raw.population;
    record.currency_code = raw.currency_code.clone();
    record.exchange_rate = exchange_rate;
    record.estimated_gdp = estimated_gdp;
    record.flag_url = raw.flag_url.clone();
    record.last_refreshed_at = refreshed_at;

    Merged { record, intent }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(name: &str, population: u64, currency: Option<&str>) -> RawCountry {
        RawCountry {
            name: name.to_string(),
            capital: Some("Birnin Zana".to_string()),
            region: Some("Africa".to_string()),
            population,
            flag_url: Some("https://flags.example/wk.svg".to_string()),
            currency_code: currency.map(str::to_string),
        }
    }

    fn rates() -> RateTable {
        RateTable::from([
            ("WKD".to_string(), 500.0),
            ("ZRO".to_string(), 0.0),
            ("NEG".to_string(), -2.0),
        ])
    }

    fn batch_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_skip_rule() {
        assert!(should_skip(&raw("", 100, None)));
        assert!(should_skip(&raw("   ", 100, None)));
        assert!(should_skip(&raw("Wakanda", 0, Some("WKD"))));
        assert!(!should_skip(&raw("Wakanda", 1, None)));
    }

    #[test]
    fn test_no_currency_yields_zero_gdp() {
        let merged = merge(
            &raw("Antarctica", 1000, None),
            &rates(),
            None,
            batch_time(),
            &FixedMultiplier(1500.0),
        );
        assert_eq!(merged.record.estimated_gdp, Some(0.0));
        assert_eq!(merged.record.exchange_rate, None);
        assert_eq!(merged.record.currency_code, None);
    }

    #[test]
    fn test_unresolved_rate_leaves_both_absent() {
        for code in ["XXX", "ZRO", "NEG"] {
            let merged = merge(
                &raw("Nowhere", 1000, Some(code)),
                &rates(),
                None,
                batch_time(),
                &FixedMultiplier(1500.0),
            );
            assert_eq!(merged.record.currency_code.as_deref(), Some(code));
            assert_eq!(merged.record.exchange_rate, None, "code {code}");
            assert_eq!(merged.record.estimated_gdp, None, "code {code}");
        }
    }

    #[test]
    fn test_resolved_rate_with_fixed_multiplier() {
        let merged = merge(
            &raw("Wakanda", 1_000_000, Some("WKD")),
            &rates(),
            None,
            batch_time(),
            &FixedMultiplier(1500.0),
        );
        assert_eq!(merged.intent, WriteIntent::Create);
        assert_eq!(merged.record.exchange_rate, Some(500.0));
        assert_eq!(merged.record.estimated_gdp, Some(3_000_000.0));
        assert_eq!(merged.record.last_refreshed_at, batch_time());
    }

    #[test]
    fn test_random_multiplier_stays_in_range() {
        let multiplier = RandomMultiplier;
        for _ in 0..1000 {
            let m = multiplier.sample();
            assert!((1000.0..2000.0).contains(&m), "multiplier {m} out of range");
        }

        let merged = merge(
            &raw("Wakanda", 1_000_000, Some("WKD")),
            &rates(),
            None,
            batch_time(),
            &multiplier,
        );
        let gdp = merged.record.estimated_gdp.unwrap();
        assert!((2_000_000.0..4_000_000.0).contains(&gdp));
    }

    #[test]
    fn test_update_overwrites_and_clears_fields() {
        let existing = merge(
            &raw("Wakanda", 1_000_000, Some("WKD")),
            &rates(),
            None,
            batch_time() - chrono::Duration::days(1),
            &FixedMultiplier(1000.0),
        )
        .record;

        let update = RawCountry {
            name: "WAKANDA".to_string(),
            capital: None,
            region: Some("Africa".to_string()),
            population: 2_000_000,
            flag_url: None,
            currency_code: None,
        };
        let merged = merge(
            &update,
            &rates(),
            Some(existing),
            batch_time(),
            &FixedMultiplier(1000.0),
        );

        assert_eq!(merged.intent, WriteIntent::Update);
        assert_eq!(merged.record.name, "WAKANDA");
        assert_eq!(merged.record.capital, None);
        assert_eq!(merged.record.flag_url, None);
        assert_eq!(merged.record.currency_code, None);
        assert_eq!(merged.record.population, 2_000_000);
        assert_eq!(merged.record.estimated_gdp, Some(0.0));
        assert_eq!(merged.record.last_refreshed_at, batch_time());
    }
}
