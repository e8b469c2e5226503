//! Key-value cache abstraction with per-entry expiry.

use async_trait::async_trait;
use std::hash::Hash;
use std::time::Duration;

/// Cache of derived, disposable values. Never a source of truth.
///
/// Implementations must give atomic reads and writes of a single entry under
/// concurrent access. An entry whose TTL has elapsed reads as a miss.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Option<V>;

    /// `ttl` of `None` keeps the entry until removed.
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);

    async fn remove(&self, key: &K);

    async fn clear(&self);
}
