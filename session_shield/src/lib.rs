//! session_shield - Session security for web applications
//!
//! Hardens cookie-based sessions: transport-aware cookie attributes, fixation
//! protection by identifier rotation, per-session anti-forgery tokens and
//! idle-timeout validation with forced logout. [`SessionManager`] runs the
//! whole pipeline for each request; the individual steps are exported for
//! callers that need to compose them differently.

mod config;
mod session;
mod storage;
mod utils;

pub use config::{
    ConfigError, ConfigErrorCode, ENV_SESSION_COOKIE_NAME, ENV_SESSION_LOGIN_URL,
    ENV_SESSION_SAME_SITE, ENV_SESSION_SECRET, ENV_SESSION_STORE_TIMEOUT_MS,
    ENV_SESSION_STORE_TYPE, ENV_SESSION_STORE_URL, ENV_SESSION_TIMEOUT, SessionConfig,
    SessionConfigBuilder, SessionSecret, StoreBackend,
};

pub use session::{
    ActiveSession, AlwaysValid, CSRF_HEADER, CookiePolicy, InvalidReason, Principal,
    PrincipalValidator, RedirectTarget, RequestInfo, SameSite, SessionContext, SessionError,
    SessionManager, SessionOutcome, SessionState, SessionStore, TransportState, Validation,
    X_FORWARDED_PROTO, build_cookie_policy, csrf_token_from_headers, enforce_at,
    ensure_csrf_token, guard_fixation, inspect_transport, is_login_request, require_csrf_token,
    validate_at, verify_csrf_token,
};

pub use storage::{
    CacheData, CacheStore, InMemoryCacheStore, RedisCacheStore, StorageError, open_cache_store,
};
