//! Query operations over the stored countries.

use crate::core::cache::Cache;
use crate::core::country::{CountryView, ListQuery, StatusView, format_timestamp};
use crate::core::error::{AppError, AppResult};
use crate::core::store::CountryStore;
use crate::store::MemoryCache;
use crate::summary::SummaryArtifact;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub type ListingCache = dyn Cache<String, Arc<Vec<CountryView>>>;

pub fn memory_listing_cache() -> Arc<ListingCache> {
    Arc::new(MemoryCache::<String, Arc<Vec<CountryView>>>::new())
}

/// Read side of the application, plus delete.
///
/// Listings are memoised in the shared listing cache under a key built from
/// the filter and sort; any mutation of the country set clears every listing.
///
/// Every invalidation bumps a generation number. A listing read from the
/// store is only cached if no invalidation happened since the read began, and
/// the check and the insert run under the same lock as the bump.
#[derive(Clone)]
pub struct CountryService {
    store: Arc<dyn CountryStore>,
    listings: Arc<ListingCache>,
    generation: Arc<Mutex<u64>>,
    cache_ttl: Duration,
    artifact: SummaryArtifact,
}

impl CountryService {
    pub fn new(
        store: Arc<dyn CountryStore>,
        listings: Arc<ListingCache>,
        cache_ttl: Duration,
        artifact: SummaryArtifact,
    ) -> Self {
        Self {
            store,
            listings,
            generation: Arc::new(Mutex::new(0)),
            cache_ttl,
            artifact,
        }
    }

    pub async fn list_countries(&self, query: &ListQuery) -> AppResult<Arc<Vec<CountryView>>> {
        let key = query.cache_key();
        if let Some(cached) = self.listings.get(&key).await {
            return Ok(cached);
        }

        let started = *self.generation.lock().await;
        let mut records = self.store.list().await?;
        query.apply(&mut records);
        let views: Arc<Vec<CountryView>> = Arc::new(records.iter().map(CountryView::from).collect());
        debug!("Listing {} matched {} countries", key, views.len());

        let generation = self.generation.lock().await;
        if *generation == started {
            self.listings
                .put(key, Arc::clone(&views), Some(self.cache_ttl))
                .await;
        } else {
            debug!("Listings invalidated during read, not caching {}", key);
        }
        Ok(views)
    }

    pub async fn get_country(&self, name: &str) -> AppResult<CountryView> {
        self.store
            .find_by_name(name)
            .await?
            .map(|record| CountryView::from(&record))
            .ok_or_else(|| AppError::NotFound("Country".to_string()))
    }

    /// Deletes by name ignoring case. Listings are only invalidated when a
    /// row was actually removed.
    pub async fn delete_country(&self, name: &str) -> AppResult<()> {
        if !self.store.delete_by_name(name).await? {
            return Err(AppError::NotFound("Country".to_string()));
        }
        info!("Deleted country {}", name);
        self.invalidate_listings().await;
        Ok(())
    }

    pub async fn status(&self) -> AppResult<StatusView> {
        let total_countries = self.store.count().await?;
        let status = self.store.status().await?;
        Ok(StatusView {
            total_countries,
            last_refreshed_at: status.map(|s| format_timestamp(&s.last_refreshed_at)),
        })
    }

    pub async fn summary_image(&self) -> AppResult<Vec<u8>> {
        self.artifact.read().await
    }

    pub async fn invalidate_listings(&self) {
        let mut generation = self.generation.lock().await;
        *generation += 1;
        debug!("Invalidating country listings (generation {})", *generation);
        self.listings.clear().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::country::{CountryRecord, SortMode, StatusRecord};
    use crate::store::MemoryCountryStore;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Wraps a store and counts how often the listing is read.
    #[derive(Default)]
    pub(crate) struct CountingStore {
        pub(crate) inner: MemoryCountryStore,
        pub(crate) list_calls: AtomicUsize,
    }

    #[async_trait]
    impl CountryStore for CountingStore {
        async fn find_by_name(&self, name: &str) -> AppResult<Option<CountryRecord>> {
            self.inner.find_by_name(name).await
        }
        async fn save(&self, record: &CountryRecord) -> AppResult<()> {
            self.inner.save(record).await
        }
        async fn list(&self) -> AppResult<Vec<CountryRecord>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list().await
        }
        async fn delete_by_name(&self, name: &str) -> AppResult<bool> {
            self.inner.delete_by_name(name).await
        }
        async fn count(&self) -> AppResult<usize> {
            self.inner.count().await
        }
        async fn status(&self) -> AppResult<Option<StatusRecord>> {
            self.inner.status().await
        }
        async fn save_status(&self, status: &StatusRecord) -> AppResult<()> {
            self.inner.save_status(status).await
        }
    }

    fn record(name: &str, region: &str, gdp: Option<f64>) -> CountryRecord {
        CountryRecord {
            name: name.to_string(),
            capital: None,
            region: Some(region.to_string()),
            population: 1000,
            currency_code: Some("XOF".to_string()),
            exchange_rate: gdp.map(|_| 600.0),
            estimated_gdp: gdp,
            flag_url: None,
            last_refreshed_at: Utc.with_ymd_and_hms(2025, 4, 5, 6, 7, 8).unwrap(),
        }
    }

    async fn service_with(records: &[CountryRecord]) -> (CountryService, Arc<CountingStore>) {
        let store = Arc::new(CountingStore::default());
        for r in records {
            store.save(r).await.unwrap();
        }
        let dir = std::env::temp_dir().join("gdpx-service-tests-missing");
        let service = CountryService::new(
            store.clone(),
            memory_listing_cache(),
            Duration::from_secs(3600),
            SummaryArtifact::new(dir.join("summary.svg")),
        );
        (service, store)
    }

    #[tokio::test]
    async fn test_listing_is_served_from_cache() {
        let (service, store) = service_with(&[
            record("Benin", "Africa", Some(5.0)),
            record("Togo", "Africa", Some(9.0)),
            record("France", "Europe", None),
        ])
        .await;

        let query = ListQuery {
            region: Some("Africa".to_string()),
            currency: None,
            sort: SortMode::GdpDesc,
        };
        let first = service.list_countries(&query).await.unwrap();
        let second = service.list_countries(&query).await.unwrap();

        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        let names: Vec<_> = first.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Togo", "Benin"]);

        // A different filter combination is its own entry
        service.list_countries(&ListQuery::default()).await.unwrap();
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_listing_requeries_store() {
        let store = Arc::new(CountingStore::default());
        let service = CountryService::new(
            store.clone(),
            memory_listing_cache(),
            Duration::from_millis(10),
            SummaryArtifact::new(std::env::temp_dir().join("gdpx-unused.svg")),
        );

        service.list_countries(&ListQuery::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        service.list_countries(&ListQuery::default()).await.unwrap();
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delete_invalidates_listings() {
        let (service, store) = service_with(&[
            record("Benin", "Africa", Some(5.0)),
            record("Togo", "Africa", Some(9.0)),
        ])
        .await;

        assert_eq!(service.list_countries(&ListQuery::default()).await.unwrap().len(), 2);
        service.delete_country("TOGO").await.unwrap();

        let after = service.list_countries(&ListQuery::default()).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].name, "Benin");
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found_and_keeps_cache() {
        let (service, store) = service_with(&[record("Benin", "Africa", Some(5.0))]).await;

        service.list_countries(&ListQuery::default()).await.unwrap();
        let err = service.delete_country("Atlantis").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        service.list_countries(&ListQuery::default()).await.unwrap();
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_country_ignores_case() {
        let (service, _) = service_with(&[record("Côte d'Ivoire", "Africa", Some(5.0))]).await;

        let view = service.get_country("CÔTE D'IVOIRE").await.unwrap();
        assert_eq!(view.name, "Côte d'Ivoire");
        assert_eq!(view.last_refreshed_at, "2025-04-05T06:07:08Z");

        let err = service.get_country("Atlantis").await.unwrap_err();
        assert_eq!(err.to_string(), "Country not found");
    }

    /// Parks the first `list` call after it has read the rows.
    #[derive(Default)]
    struct PausingStore {
        inner: MemoryCountryStore,
        paused: AtomicBool,
        reading: Notify,
        resume: Notify,
    }

    #[async_trait]
    impl CountryStore for PausingStore {
        async fn find_by_name(&self, name: &str) -> AppResult<Option<CountryRecord>> {
            self.inner.find_by_name(name).await
        }
        async fn save(&self, record: &CountryRecord) -> AppResult<()> {
            self.inner.save(record).await
        }
        async fn list(&self) -> AppResult<Vec<CountryRecord>> {
            let records = self.inner.list().await?;
            if !self.paused.swap(true, Ordering::SeqCst) {
                self.reading.notify_one();
                self.resume.notified().await;
            }
            Ok(records)
        }
        async fn delete_by_name(&self, name: &str) -> AppResult<bool> {
            self.inner.delete_by_name(name).await
        }
        async fn count(&self) -> AppResult<usize> {
            self.inner.count().await
        }
        async fn status(&self) -> AppResult<Option<StatusRecord>> {
            self.inner.status().await
        }
        async fn save_status(&self, status: &StatusRecord) -> AppResult<()> {
            self.inner.save_status(status).await
        }
    }

    #[tokio::test]
    async fn test_listing_read_before_invalidation_is_not_cached() {
        let store = Arc::new(PausingStore::default());
        let service = CountryService::new(
            store.clone(),
            memory_listing_cache(),
            Duration::from_secs(3600),
            SummaryArtifact::new(std::env::temp_dir().join("gdpx-unused.svg")),
        );

        let reader = {
            let service = service.clone();
            tokio::spawn(async move { service.list_countries(&ListQuery::default()).await })
        };
        store.reading.notified().await;

        // A write lands while the read is still in flight
        store.save(&record("Wakanda", "Africa", Some(5.0))).await.unwrap();
        service.invalidate_listings().await;
        store.resume.notify_one();

        let stale = reader.await.unwrap().unwrap();
        assert!(stale.is_empty());

        let fresh = service.list_countries(&ListQuery::default()).await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].name, "Wakanda");
    }

    #[tokio::test]
    async fn test_status_and_missing_summary() {
        let (service, store) = service_with(&[]).await;

        let status = service.status().await.unwrap();
        assert_eq!(status.total_countries, 0);
        assert_eq!(status.last_refreshed_at, None);

        store.save(&record("Benin", "Africa", None)).await.unwrap();
        store
            .save_status(&StatusRecord {
                last_refreshed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            })
            .await
            .unwrap();
        let status = service.status().await.unwrap();
        assert_eq!(status.total_countries, 1);
        assert_eq!(status.last_refreshed_at.as_deref(), Some("2025-01-01T00:00:00Z"));

        let err = service.summary_image().await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
