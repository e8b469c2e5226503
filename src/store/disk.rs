use crate::core::country::{CountryRecord, StatusRecord, name_key};
use crate::core::error::{AppError, AppResult};
use crate::core::store::CountryStore;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use tracing::debug;

const COUNTRIES_PARTITION: &str = "countries";
const STATUS_PARTITION: &str = "status";
const STATUS_KEY: &str = "singleton";

/// Country store backed by a fjall keyspace.
///
/// Countries live in their own partition keyed by lowercase name, so the
/// case-insensitive uniqueness of names is enforced by the key itself. Values
/// are JSON documents.
pub struct DiskCountryStore {
    keyspace: Keyspace,
    countries: PartitionHandle,
    status: PartitionHandle,
}

impl DiskCountryStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        std::fs::create_dir_all(path).map_err(AppError::persistence)?;

        let keyspace = fjall::Config::new(path).open()?;
        let countries =
            keyspace.open_partition(COUNTRIES_PARTITION, PartitionCreateOptions::default())?;
        let status = keyspace.open_partition(STATUS_PARTITION, PartitionCreateOptions::default())?;
        debug!("Opened country store at {}", path.display());

        Ok(Self {
            keyspace,
            countries,
            status,
        })
    }

    fn persist(&self, mode: PersistMode) -> AppResult<()> {
        self.keyspace.persist(mode)?;
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> AppResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(AppError::persistence)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> AppResult<T> {
    serde_json::from_slice(bytes).map_err(AppError::persistence)
}

#[async_trait]
impl CountryStore for DiskCountryStore {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<CountryRecord>> {
        match self.countries.get(name_key(name))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &CountryRecord) -> AppResult<()> {
        // Record writes only reach the OS buffers; the status stamp that
        // closes a batch syncs them to disk.
        self.countries.insert(record.key(), encode(record)?)?;
        self.persist(PersistMode::Buffer)
    }

    async fn list(&self) -> AppResult<Vec<CountryRecord>> {
        self.countries
            .iter()
            .map(|item| {
                let (_, value) = item?;
                decode(&value)
            })
            .collect()
    }

    async fn delete_by_name(&self, name: &str) -> AppResult<bool> {
        let key = name_key(name);
        if !self.countries.contains_key(&key)? {
            return Ok(false);
        }
        self.countries.remove(key)?;
        self.persist(PersistMode::SyncAll)?;
        Ok(true)
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.countries.len()?)
    }

    async fn status(&self) -> AppResult<Option<StatusRecord>> {
        match self.status.get(STATUS_KEY)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn save_status(&self, status: &StatusRecord) -> AppResult<()> {
        self.status.insert(STATUS_KEY, encode(status)?)?;
        self.persist(PersistMode::SyncAll)
    }
}
