use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};

use crate::config::SessionConfig;
use crate::session::errors::SessionError;
use crate::session::types::{CookiePolicy, Principal, SessionContext, TransportState};
use crate::storage::{CacheData, CacheStore, InMemoryCacheStore, StorageError};
use crate::utils::gen_random_hex;

use super::cookie::build_cookie_policy;
use super::pipeline::SessionManager;
use super::principal::PrincipalValidator;
use super::store::SessionStore;

pub(crate) fn test_config() -> SessionConfig {
    SessionConfig::builder()
        .cookie_name("TestSess")
        .timeout_secs(3600)
        .secret("test-secret")
        .login_url("/login")
        .build()
        .expect("test config is valid")
}

pub(crate) fn test_policy() -> CookiePolicy {
    build_cookie_policy(&TransportState { is_secure: false }, &test_config())
}

pub(crate) fn memory_session_store() -> SessionStore {
    SessionStore::new(Box::new(InMemoryCacheStore::new()), &test_config())
}

pub(crate) fn memory_manager(principals: Arc<dyn PrincipalValidator>) -> SessionManager {
    SessionManager::new(Arc::new(test_config()), memory_session_store(), principals)
}

/// Manager over a store that counts identifier rotations.
pub(crate) fn counting_manager(
    principals: Arc<dyn PrincipalValidator>,
) -> (SessionManager, Arc<AtomicUsize>) {
    let replacements = Arc::new(AtomicUsize::new(0));
    let cache = CountingCacheStore {
        inner: InMemoryCacheStore::new(),
        replacements: replacements.clone(),
    };
    let config = test_config();
    let store = SessionStore::new(Box::new(cache), &config);
    (
        SessionManager::new(Arc::new(config), store, principals),
        replacements,
    )
}

pub(crate) fn fresh_context() -> SessionContext {
    SessionContext::new_at("F".repeat(43), Utc::now())
}

/// An initialized, logged-in context that has not been persisted.
pub(crate) fn authenticated_context(principal_id: &str, at: DateTime<Utc>) -> SessionContext {
    let mut ctx = SessionContext::new_at("A".repeat(43), at);
    ctx.initialized = true;
    ctx.csrf_token = gen_random_hex(32).unwrap();
    ctx.principal = Some(Principal {
        id: principal_id.to_string(),
        authenticated_at: at,
    });
    ctx
}

pub(crate) fn cookie_headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        COOKIE,
        HeaderValue::from_str(&format!("TestSess={value}")).unwrap(),
    );
    headers
}

/// Value of the session cookie in a `Set-Cookie` header.
pub(crate) fn cookie_value_from(headers: &HeaderMap) -> String {
    let set_cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie
        .split(';')
        .next()
        .and_then(|kv| kv.split_once('='))
        .map(|(_, v)| v.to_string())
        .unwrap()
}

/// A store that answers every call only after `delay_ms`.
pub(crate) struct SlowCacheStore {
    delay: StdDuration,
    inner: InMemoryCacheStore,
}

impl SlowCacheStore {
    pub(crate) fn new(delay_ms: u64) -> Self {
        Self {
            delay: StdDuration::from_millis(delay_ms),
            inner: InMemoryCacheStore::new(),
        }
    }
}

#[async_trait]
impl CacheStore for SlowCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn put_with_ttl(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<(), StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.put_with_ttl(prefix, key, value, ttl).await
    }

    async fn put_if_exists(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<bool, StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.put_if_exists(prefix, key, value, ttl).await
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(prefix, key).await
    }

    async fn remove(&mut self, prefix: &str, key: &str) -> Result<(), StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.remove(prefix, key).await
    }

    async fn replace(
        &mut self,
        prefix: &str,
        old_key: &str,
        new_key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<(), StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.replace(prefix, old_key, new_key, value, ttl).await
    }
}

/// Principal collaborator with a revocation list.
#[derive(Default)]
pub(crate) struct RevocablePrincipals {
    revoked: Mutex<HashSet<String>>,
}

impl RevocablePrincipals {
    pub(crate) fn revoke(&self, principal_id: &str) {
        self.revoked
            .lock()
            .unwrap()
            .insert(principal_id.to_string());
    }
}

#[async_trait]
impl PrincipalValidator for RevocablePrincipals {
    async fn is_still_valid(&self, principal: &Principal) -> Result<bool, SessionError> {
        Ok(!self.revoked.lock().unwrap().contains(&principal.id))
    }
}

/// Principal collaborator whose backend is down.
pub(crate) struct FailingPrincipals;

#[async_trait]
impl PrincipalValidator for FailingPrincipals {
    async fn is_still_valid(&self, _principal: &Principal) -> Result<bool, SessionError> {
        Err(SessionError::Principal("user store offline".to_string()))
    }
}

/// Memory store that counts `replace` calls.
pub(crate) struct CountingCacheStore {
    inner: InMemoryCacheStore,
    replacements: Arc<AtomicUsize>,
}

#[async_trait]
impl CacheStore for CountingCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        self.inner.init().await
    }

    async fn put_with_ttl(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<(), StorageError> {
        self.inner.put_with_ttl(prefix, key, value, ttl).await
    }

    async fn put_if_exists(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<bool, StorageError> {
        self.inner.put_if_exists(prefix, key, value, ttl).await
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        self.inner.get(prefix, key).await
    }

    async fn remove(&mut self, prefix: &str, key: &str) -> Result<(), StorageError> {
        self.inner.remove(prefix, key).await
    }

    async fn replace(
        &mut self,
        prefix: &str,
        old_key: &str,
        new_key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<(), StorageError> {
        self.replacements.fetch_add(1, Ordering::SeqCst);
        self.inner.replace(prefix, old_key, new_key, value, ttl).await
    }
}
