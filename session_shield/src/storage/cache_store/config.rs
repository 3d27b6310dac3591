use crate::config::StoreBackend;
use crate::storage::errors::StorageError;

use super::types::{CacheStore, InMemoryCacheStore, RedisCacheStore};

/// Build the cache store selected by configuration and verify it is reachable.
///
/// The connection URL is not logged since it may carry credentials.
pub async fn open_cache_store(backend: &StoreBackend) -> Result<Box<dyn CacheStore>, StorageError> {
    tracing::info!("Initializing session cache store with type: {}", backend.kind());

    let store: Box<dyn CacheStore> = match backend {
        StoreBackend::Memory => Box::new(InMemoryCacheStore::new()),
        StoreBackend::Redis { url } => {
            let client = redis::Client::open(url.as_str()).map_err(|e| {
                tracing::error!("Failed to create Redis client: {}", e);
                StorageError::from(e)
            })?;
            let store = RedisCacheStore::new(client);
            if let Err(e) = store.init().await {
                tracing::error!("Failed to connect to Redis: {}", e);
                return Err(e);
            }
            Box::new(store)
        }
    };

    tracing::info!("Connected to session cache store: type={}", backend.kind());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CacheData;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_open_memory_store() {
        let mut store = open_cache_store(&StoreBackend::Memory).await.unwrap();

        let value = CacheData {
            value: "v".to_string(),
            expires_at: Utc::now() + Duration::seconds(10),
        };
        store.put_with_ttl("session", "k", value, 10).await.unwrap();

        assert!(store.get("session", "k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_open_redis_store_with_malformed_url_fails() {
        let backend = StoreBackend::Redis {
            url: "not a redis url".to_string(),
        };

        assert!(open_cache_store(&backend).await.is_err());
    }
}
