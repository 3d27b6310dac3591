use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use headers::HeaderMapExt;
use http::HeaderMap;
use tokio::sync::Mutex;

use crate::config::{SessionConfig, SessionSecret};
use crate::session::errors::SessionError;
use crate::session::types::{CookiePolicy, SessionContext, StoredSession};
use crate::storage::{CacheStore, StorageError, open_cache_store};
use crate::utils::gen_random_string;

use super::cookie::header_set_cookie;
use super::signing::{sign_session_id, verify_signed_session_id};

const SESSION_PREFIX: &str = "session";
const SESSION_ID_BYTES: usize = 32;

/// Boundary to the session persistence backend.
///
/// Cloning is cheap; clones share the same backing store.
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<Mutex<Box<dyn CacheStore>>>,
    secret: SessionSecret,
    op_timeout: Duration,
    ttl_secs: u64,
}

impl SessionStore {
    pub fn new(cache: Box<dyn CacheStore>, config: &SessionConfig) -> Self {
        Self {
            cache: Arc::new(Mutex::new(cache)),
            secret: config.secret().clone(),
            op_timeout: config.store_timeout(),
            ttl_secs: config.timeout_secs(),
        }
    }

    /// Open the backend named in the configuration.
    pub async fn connect(config: &SessionConfig) -> Result<Self, SessionError> {
        let cache = open_cache_store(config.store()).await?;
        Ok(Self::new(cache, config))
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!("Session store {} failed: {}", op, e);
                Err(e.into())
            }
            Err(_) => {
                tracing::error!(
                    "Session store {} timed out after {:?}",
                    op,
                    self.op_timeout
                );
                Err(SessionError::StoreUnavailable(format!("{op} timed out")))
            }
        }
    }

    /// Load the session named by the request cookie, or start a new one.
    ///
    /// Unknown, expired, unsigned or unreadable identifiers are never adopted:
    /// the caller gets a brand-new context instead.
    pub async fn open(
        &self,
        headers: &HeaderMap,
        policy: &CookiePolicy,
    ) -> Result<SessionContext, SessionError> {
        self.open_at(headers, policy, Utc::now()).await
    }

    pub(crate) async fn open_at(
        &self,
        headers: &HeaderMap,
        policy: &CookiePolicy,
        now: DateTime<Utc>,
    ) -> Result<SessionContext, SessionError> {
        if let Some(ctx) = self.load_from_cookie(headers, policy).await? {
            return Ok(ctx);
        }

        let session_id = gen_random_string(SESSION_ID_BYTES)?;
        tracing::debug!("Starting new session");
        Ok(SessionContext::new_at(session_id, now))
    }

    async fn load_from_cookie(
        &self,
        headers: &HeaderMap,
        policy: &CookiePolicy,
    ) -> Result<Option<SessionContext>, SessionError> {
        let Some(cookies) = headers.typed_get::<headers::Cookie>() else {
            tracing::debug!("No cookie header found");
            return Ok(None);
        };
        let Some(cookie_value) = cookies.get(&policy.name) else {
            tracing::debug!("No session cookie '{}' found in cookies", policy.name);
            return Ok(None);
        };
        let Some(session_id) = verify_signed_session_id(&self.secret, cookie_value) else {
            tracing::warn!("Rejected session cookie with a bad format or signature");
            return Ok(None);
        };

        let cached = self
            .bounded("get", async {
                self.cache.lock().await.get(SESSION_PREFIX, session_id).await
            })
            .await?;

        let Some(cached) = cached else {
            tracing::debug!("Session cookie refers to an unknown or expired session");
            return Ok(None);
        };

        match StoredSession::try_from(cached) {
            Ok(stored) => Ok(Some(SessionContext::from_stored(
                session_id.to_string(),
                stored,
            ))),
            Err(e) => {
                tracing::warn!("Discarding unreadable session record: {}", e);
                self.bounded("remove", async {
                    self.cache.lock().await.remove(SESSION_PREFIX, session_id).await
                })
                .await?;
                Ok(None)
            }
        }
    }

    /// Move the session to a freshly generated identifier.
    ///
    /// The new record is written and the old identifier dropped in one store
    /// operation, so the old identifier cannot be replayed afterwards.
    pub async fn regenerate_id(&self, ctx: &mut SessionContext) -> Result<(), SessionError> {
        let new_id = gen_random_string(SESSION_ID_BYTES)?;
        let data = ctx.to_stored().into_cache_data(self.ttl_secs)?;
        let ttl = self.ttl_secs as usize;

        self.bounded("replace", async {
            self.cache
                .lock()
                .await
                .replace(SESSION_PREFIX, &ctx.session_id, &new_id, data, ttl)
                .await
        })
        .await?;

        ctx.session_id = new_id;
        ctx.is_new = false;
        tracing::debug!("Session identifier regenerated");
        Ok(())
    }

    /// Invalidate the identifier and clear every attribute.
    ///
    /// Calling it again on a destroyed context does nothing.
    pub async fn destroy(&self, ctx: &mut SessionContext) -> Result<(), SessionError> {
        if ctx.destroyed {
            tracing::debug!("Session already destroyed");
            return Ok(());
        }

        ctx.csrf_token.clear();
        ctx.principal = None;
        ctx.initialized = false;

        if !ctx.is_new {
            self.bounded("remove", async {
                self.cache
                    .lock()
                    .await
                    .remove(SESSION_PREFIX, &ctx.session_id)
                    .await
            })
            .await?;
        }

        ctx.destroyed = true;
        tracing::debug!("Session destroyed");
        Ok(())
    }

    /// Persist the context and produce the `Set-Cookie` header for the response.
    ///
    /// Must run before any body bytes are sent. A destroyed context yields a
    /// removal cookie. A context whose identifier was rotated or destroyed by a
    /// concurrent request is not written back and leaves the cookie untouched.
    pub async fn commit(
        &self,
        ctx: SessionContext,
        policy: &CookiePolicy,
    ) -> Result<HeaderMap, SessionError> {
        let mut headers = HeaderMap::new();

        if ctx.destroyed {
            header_set_cookie(&mut headers, policy.removal_value())?;
            return Ok(headers);
        }

        let data = ctx.to_stored().into_cache_data(self.ttl_secs)?;
        let ttl = self.ttl_secs as usize;

        let written = if ctx.is_new {
            self.bounded("put", async {
                self.cache
                    .lock()
                    .await
                    .put_with_ttl(SESSION_PREFIX, &ctx.session_id, data, ttl)
                    .await
            })
            .await?;
            true
        } else {
            self.bounded("update", async {
                self.cache
                    .lock()
                    .await
                    .put_if_exists(SESSION_PREFIX, &ctx.session_id, data, ttl)
                    .await
            })
            .await?
        };

        if !written {
            tracing::debug!("Session was replaced concurrently; skipping write-back");
            return Ok(headers);
        }

        let signed = sign_session_id(&self.secret, &ctx.session_id)?;
        header_set_cookie(&mut headers, policy.set_cookie_value(&signed))?;
        Ok(headers)
    }

    #[cfg(test)]
    pub(crate) async fn contains(&self, session_id: &str) -> bool {
        self.cache
            .lock()
            .await
            .get(SESSION_PREFIX, session_id)
            .await
            .ok()
            .flatten()
            .is_some()
    }

    #[cfg(test)]
    pub(crate) fn signed_cookie(&self, session_id: &str) -> String {
        sign_session_id(&self.secret, session_id).unwrap()
    }
}
