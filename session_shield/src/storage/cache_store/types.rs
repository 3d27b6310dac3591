use async_trait::async_trait;
use std::collections::HashMap;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

pub struct InMemoryCacheStore {
    pub(super) entry: HashMap<String, CacheData>,
    pub(super) writes_since_purge: usize,
}

pub struct RedisCacheStore {
    pub(super) client: redis::Client,
}

/// Backing store for session records.
///
/// Implementations are shared behind a `tokio::sync::Mutex`; every method must
/// return in bounded time or the caller's timeout will fail the request closed.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Initialize the store. This is called when the store is created.
    async fn init(&self) -> Result<(), StorageError>;

    /// Put a value into the store with a TTL in seconds.
    async fn put_with_ttl(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<(), StorageError>;

    /// Overwrite an existing, unexpired value. Returns false, writing nothing,
    /// when the key is absent.
    async fn put_if_exists(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<bool, StorageError>;

    /// Get a value from the store. Expired values are reported as absent.
    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError>;

    /// Remove a value from the store. Removing a missing key is not an error.
    async fn remove(&mut self, prefix: &str, key: &str) -> Result<(), StorageError>;

    /// Store `value` under `new_key` and drop `old_key` as one atomic step.
    ///
    /// No reader may observe the old key gone while the new one is still missing,
    /// or both keys live at once.
    async fn replace(
        &mut self,
        prefix: &str,
        old_key: &str,
        new_key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<(), StorageError>;
}
