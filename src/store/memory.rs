use crate::core::cache::Cache;
use crate::core::country::{CountryRecord, StatusRecord, name_key};
use crate::core::error::AppResult;
use crate::core::store::CountryStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct CacheValue<V> {
    value: V,
    expires_at: Option<Instant>,
}

/// In-memory cache implementation using a HashMap behind a single mutex
pub struct MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, CacheValue<V>>>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Creates a new MemoryCache instance
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.inner.lock().await;
        match cache.get(key) {
            Some(entry) if entry.expires_at.is_some_and(|expiry| expiry <= Instant::now()) => {}
            Some(entry) => {
                debug!("Cache HIT for key: {:?}", key);
                return Some(entry.value.clone());
            }
            None => {
                debug!("Cache MISS for key: {:?}", key);
                return None;
            }
        }
        debug!("Cache entry expired for key: {:?}", key);
        cache.remove(key);
        None
    }

    async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        let expires_at = ttl.map(|duration| Instant::now() + duration);
        let cache_value = CacheValue { value, expires_at };

        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        cache.insert(key, cache_value);
    }

    async fn remove(&self, key: &K) {
        let mut cache = self.inner.lock().await;
        cache.remove(key);
        debug!("Cache REMOVE for key: {:?}", key);
    }

    async fn clear(&self) {
        let mut cache = self.inner.lock().await;
        cache.clear();
        debug!("Cache CLEAR");
    }
}

#[derive(Default)]
struct MemoryTables {
    countries: BTreeMap<String, CountryRecord>,
    status: Option<StatusRecord>,
}

/// Country store kept entirely in memory. Nothing survives the process.
#[derive(Default)]
pub struct MemoryCountryStore {
    inner: Mutex<MemoryTables>,
}

impl MemoryCountryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CountryStore for MemoryCountryStore {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<CountryRecord>> {
        let tables = self.inner.lock().await;
        Ok(tables.countries.get(&name_key(name)).cloned())
    }

    async fn save(&self, record: &CountryRecord) -> AppResult<()> {
        let mut tables = self.inner.lock().await;
        tables.countries.insert(record.key(), record.clone());
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<CountryRecord>> {
        let tables = self.inner.lock().await;
        Ok(tables.countries.values().cloned().collect())
    }

    async fn delete_by_name(&self, name: &str) -> AppResult<bool> {
        let mut tables = self.inner.lock().await;
        Ok(tables.countries.remove(&name_key(name)).is_some())
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.inner.lock().await.countries.len())
    }

    async fn status(&self) -> AppResult<Option<StatusRecord>> {
        Ok(self.inner.lock().await.status)
    }

    async fn save_status(&self, status: &StatusRecord) -> AppResult<()> {
        self.inner.lock().await.status = Some(*status);
        Ok(())
    }
}
