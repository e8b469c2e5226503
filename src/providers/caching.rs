use crate::core::country::ExchangeRateSnapshot;
use crate::core::error::AppResult;
use crate::core::source::RateSource;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

pub const RATE_FRESHNESS: Duration = Duration::from_secs(60 * 60);

/// Holds the latest exchange-rate snapshot and refetches it once it is
/// older than the freshness window.
///
/// The snapshot sits behind one mutex which is held across the fetch, so
/// concurrent callers never see a half-replaced table and a stale cache
/// triggers a single upstream request.
pub struct RateCache {
    inner: Arc<dyn RateSource>,
    freshness: Duration,
    snapshot: Mutex<Option<Arc<ExchangeRateSnapshot>>>,
}

impl RateCache {
    pub fn new(inner: Arc<dyn RateSource>) -> Self {
        Self::with_freshness(inner, RATE_FRESHNESS)
    }

    pub fn with_freshness(inner: Arc<dyn RateSource>, freshness: Duration) -> Self {
        Self {
            inner,
            freshness,
            snapshot: Mutex::new(None),
        }
    }

    fn is_fresh(&self, snapshot: &ExchangeRateSnapshot) -> bool {
        let age = Utc::now().signed_duration_since(snapshot.captured_at);
        age.to_std().map_or(true, |age| age < self.freshness)
    }

    /// Returns the current snapshot, fetching a new one when missing or
    /// stale. A failed fetch leaves the previous snapshot in place.
    pub async fn snapshot(&self) -> AppResult<Arc<ExchangeRateSnapshot>> {
        let mut guard = self.snapshot.lock().await;
        if let Some(snapshot) = guard.as_ref() {
            if self.is_fresh(snapshot) {
                debug!("Cache hit for exchange rates");
                return Ok(Arc::clone(snapshot));
            }
            debug!("Exchange rates captured at {} are stale", snapshot.captured_at);
        } else {
            debug!("Cache miss for exchange rates");
        }

        let fresh = Arc::new(self.inner.fetch_rates().await?);
        *guard = Some(Arc::clone(&fresh));
        Ok(fresh)
    }
}
