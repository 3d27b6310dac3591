use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::session::errors::SessionError;
use crate::storage::CacheData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lax => "Lax",
            Self::Strict => "Strict",
            Self::None => "None",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SameSite {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lax" => Ok(Self::Lax),
            "strict" => Ok(Self::Strict),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// Whether the current request arrived over a secure transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportState {
    pub is_secure: bool,
}

/// Cookie attributes for one response, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub max_age: u64,
    pub name: String,
    pub path: String,
}

/// The authenticated user a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub authenticated_at: DateTime<Utc>,
}

/// Trust status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No principal attached.
    Fresh,
    /// Principal attached by a login, not re-validated since.
    Authenticated,
    /// Re-validated within the timeout on a later request.
    Valid,
    /// Destroyed after expiry, revocation or logout.
    Terminated,
}

/// Per-request view of session state.
///
/// Produced by [`SessionStore::open`](super::SessionStore::open), mutated in
/// place by the pipeline and written back once by `commit`.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub(crate) session_id: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_validated_at: DateTime<Utc>,
    pub(crate) initialized: bool,
    pub(crate) csrf_token: String,
    pub(crate) principal: Option<Principal>,
    pub(crate) is_new: bool,
    pub(crate) destroyed: bool,
}

impl SessionContext {
    pub(crate) fn new_at(session_id: String, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            created_at: now,
            last_validated_at: now,
            initialized: false,
            csrf_token: String::new(),
            principal: None,
            is_new: true,
            destroyed: false,
        }
    }

    pub(crate) fn from_stored(session_id: String, stored: StoredSession) -> Self {
        Self {
            session_id,
            created_at: stored.created_at,
            last_validated_at: stored.last_validated_at,
            initialized: stored.initialized,
            csrf_token: stored.csrf_token,
            principal: stored.principal,
            is_new: false,
            destroyed: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_validated_at(&self) -> DateTime<Utc> {
        self.last_validated_at
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// True until the context has been persisted at least once.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn state(&self) -> SessionState {
        if self.destroyed {
            return SessionState::Terminated;
        }
        match &self.principal {
            None => SessionState::Fresh,
            Some(p) if self.last_validated_at <= p.authenticated_at => {
                SessionState::Authenticated
            }
            Some(_) => SessionState::Valid,
        }
    }

    pub(crate) fn to_stored(&self) -> StoredSession {
        StoredSession {
            created_at: self.created_at,
            last_validated_at: self.last_validated_at,
            initialized: self.initialized,
            csrf_token: self.csrf_token.clone(),
            principal: self.principal.clone(),
        }
    }
}

/// Serialized form of a session, keyed by its identifier in the cache store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredSession {
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_validated_at: DateTime<Utc>,
    pub(crate) initialized: bool,
    pub(crate) csrf_token: String,
    pub(crate) principal: Option<Principal>,
}

impl StoredSession {
    pub(crate) fn into_cache_data(self, ttl_secs: u64) -> Result<CacheData, SessionError> {
        let expires_at = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                SessionError::StoreUnavailable(format!("Session TTL out of range: {ttl_secs}s"))
            })?;
        let value = serde_json::to_string(&self)
            .map_err(|e| SessionError::StoreUnavailable(e.to_string()))?;
        Ok(CacheData { value, expires_at })
    }
}

impl TryFrom<CacheData> for StoredSession {
    type Error = SessionError;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        serde_json::from_str(&data.value).map_err(|e| SessionError::StoreUnavailable(e.to_string()))
    }
}

/// Why a session failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Inactive for longer than the configured timeout.
    Expired,
    /// The principal collaborator reports the principal is no longer valid.
    Revoked,
    /// The principal collaborator could not answer.
    Unavailable,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(InvalidReason),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// A redirect for the response collaborator to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    url: String,
    params: Vec<(String, String)>,
}

impl RedirectTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Login entry point flagged with `expired=1`.
    pub fn expired(login_url: &str) -> Self {
        Self::new(login_url).with_param("expired", "1")
    }

    /// Login entry point with the logout notice.
    pub fn logged_out(login_url: &str) -> Self {
        Self::new(login_url)
            .with_param("type", "info")
            .with_param("message", "You have been logged out.")
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Value for the `Location` header.
    pub fn location(&self) -> String {
        if self.params.is_empty() {
            return self.url.clone();
        }
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", self.url)
    }
}

/// What the pipeline needs to know about the incoming request.
#[derive(Debug, Clone, Copy)]
pub struct RequestInfo<'a> {
    pub headers: &'a HeaderMap,
    pub path: &'a str,
    /// Whether the server's own transport (TLS listener) is secure.
    pub native_secure: bool,
}
