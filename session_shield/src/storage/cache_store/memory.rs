use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

use super::types::{CacheStore, InMemoryCacheStore};

const CACHE_PREFIX: &str = "cache";
/// Expired entries are swept after this many writes.
const PURGE_INTERVAL: usize = 128;

impl InMemoryCacheStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory session cache store");
        Self {
            entry: HashMap::new(),
            writes_since_purge: 0,
        }
    }

    /// Count a write and drop expired entries once every `PURGE_INTERVAL` writes.
    fn note_write(&mut self) {
        self.writes_since_purge += 1;
        if self.writes_since_purge >= PURGE_INTERVAL {
            self.purge_expired();
        }
    }

    fn purge_expired(&mut self) {
        let now = Utc::now();
        let before = self.entry.len();
        self.entry.retain(|_, data| !data.is_expired_at(now));
        self.writes_since_purge = 0;
        let purged = before - self.entry.len();
        if purged > 0 {
            tracing::debug!("Purged {} expired entries from in-memory cache", purged);
        }
    }

    fn make_key(prefix: &str, key: &str) -> String {
        format!("{CACHE_PREFIX}:{prefix}:{key}")
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(()) // Nothing to initialize for in-memory store
    }

    async fn put_with_ttl(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        _ttl: usize,
    ) -> Result<(), StorageError> {
        let key = Self::make_key(prefix, key);
        self.entry.insert(key, value);
        self.note_write();
        Ok(())
    }

    async fn put_if_exists(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        _ttl: usize,
    ) -> Result<bool, StorageError> {
        let key = Self::make_key(prefix, key);
        let now = Utc::now();
        match self.entry.get_mut(&key) {
            Some(existing) if !existing.is_expired_at(now) => {
                *existing = value;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        let key = Self::make_key(prefix, key);
        let now = Utc::now();
        Ok(self
            .entry
            .get(&key)
            .filter(|data| !data.is_expired_at(now))
            .cloned())
    }

    async fn remove(&mut self, prefix: &str, key: &str) -> Result<(), StorageError> {
        let key = Self::make_key(prefix, key);
        self.entry.remove(&key);
        Ok(())
    }

    async fn replace(
        &mut self,
        prefix: &str,
        old_key: &str,
        new_key: &str,
        value: CacheData,
        _ttl: usize,
    ) -> Result<(), StorageError> {
        // Both steps happen while the caller holds the store mutex.
        self.entry.remove(&Self::make_key(prefix, old_key));
        self.entry.insert(Self::make_key(prefix, new_key), value);
        self.note_write();
        Ok(())
    }
}
