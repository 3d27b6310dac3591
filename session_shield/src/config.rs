//! Central configuration for the session-shield crate
//!
//! [`SessionConfig`] is built once at process start (from the environment or the
//! builder), validated as a whole, then shared by reference with every
//! component. Nothing re-reads the environment after that.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::session::SameSite;

pub const ENV_SESSION_COOKIE_NAME: &str = "SESSION_COOKIE_NAME";
pub const ENV_SESSION_TIMEOUT: &str = "SESSION_TIMEOUT";
pub const ENV_SESSION_SECRET: &str = "SESSION_SECRET";
pub const ENV_SESSION_SAME_SITE: &str = "SESSION_SAME_SITE";
pub const ENV_SESSION_LOGIN_URL: &str = "SESSION_LOGIN_URL";
pub const ENV_SESSION_STORE_TIMEOUT_MS: &str = "SESSION_STORE_TIMEOUT_MS";
pub const ENV_SESSION_STORE_TYPE: &str = "SESSION_STORE_TYPE";
pub const ENV_SESSION_STORE_URL: &str = "SESSION_STORE_URL";

const DEFAULT_LOGIN_URL: &str = "/login";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;
/// Ten years. Keeps `now + timeout` representable as a `DateTime<Utc>`.
const MAX_TIMEOUT_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Stable identifiers for configuration failures, shown to clients in place of details
/// so operators can correlate a report with the server log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    MissingCookieName,
    InvalidCookieName,
    MissingTimeout,
    InvalidTimeout,
    MissingSecret,
    InvalidSameSite,
    InvalidStore,
    InvalidStoreTimeout,
}

impl ConfigErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCookieName => "SESSNMNF",
            Self::InvalidCookieName => "SESSNMIV",
            Self::MissingTimeout => "SESSTONF",
            Self::InvalidTimeout => "SESSTOIV",
            Self::MissingSecret => "SESSSKNF",
            Self::InvalidSameSite => "SESSSSIV",
            Self::InvalidStore => "SESSSTIV",
            Self::InvalidStoreTimeout => "SESSSTTO",
        }
    }
}

impl fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Configuration error ({code}): {message}")]
pub struct ConfigError {
    pub code: ConfigErrorCode,
    pub message: String,
}

impl ConfigError {
    fn new(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Signing material. `Debug` never prints the value.
#[derive(Clone)]
pub struct SessionSecret(Vec<u8>);

impl SessionSecret {
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret(<redacted>)")
    }
}

/// Where session records live.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis { url: String },
}

impl StoreBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis { .. } => "redis",
        }
    }
}

impl fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The redis URL may embed a password.
        f.write_str(self.kind())
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    cookie_name: String,
    timeout_secs: u64,
    secret: SessionSecret,
    same_site: Option<SameSite>,
    login_url: String,
    store_timeout: Duration,
    store: StoreBackend,
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup(ENV_SESSION_TIMEOUT) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::new(
                    ConfigErrorCode::InvalidTimeout,
                    format!("{ENV_SESSION_TIMEOUT} must be a positive integer"),
                )
            })?),
            None => None,
        };

        let same_site = match lookup(ENV_SESSION_SAME_SITE) {
            Some(raw) => Some(raw.parse::<SameSite>().map_err(|_| {
                ConfigError::new(
                    ConfigErrorCode::InvalidSameSite,
                    format!("{ENV_SESSION_SAME_SITE} must be one of Lax, Strict, None"),
                )
            })?),
            None => None,
        };

        let store_timeout_ms = match lookup(ENV_SESSION_STORE_TIMEOUT_MS) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::new(
                    ConfigErrorCode::InvalidStoreTimeout,
                    format!("{ENV_SESSION_STORE_TIMEOUT_MS} must be a positive integer"),
                )
            })?),
            None => None,
        };

        let store = match lookup(ENV_SESSION_STORE_TYPE).as_deref().map(str::trim) {
            None | Some("memory") => StoreBackend::Memory,
            Some("redis") => {
                let url = lookup(ENV_SESSION_STORE_URL).ok_or_else(|| {
                    ConfigError::new(
                        ConfigErrorCode::InvalidStore,
                        format!("{ENV_SESSION_STORE_URL} must be set for the redis store"),
                    )
                })?;
                StoreBackend::Redis { url }
            }
            Some(other) => {
                return Err(ConfigError::new(
                    ConfigErrorCode::InvalidStore,
                    format!("Unsupported store type: {other}. Supported types are 'memory' and 'redis'"),
                ));
            }
        };

        let mut builder = SessionConfigBuilder {
            cookie_name: lookup(ENV_SESSION_COOKIE_NAME),
            timeout_secs,
            secret: lookup(ENV_SESSION_SECRET),
            same_site,
            login_url: lookup(ENV_SESSION_LOGIN_URL),
            store_timeout: None,
            store: Some(store),
        };
        if let Some(ms) = store_timeout_ms {
            builder = builder.store_timeout_ms(ms);
        }
        builder.build()
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Inactivity timeout, also used as the cookie `Max-Age` and the store TTL.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub(crate) fn secret(&self) -> &SessionSecret {
        &self.secret
    }

    /// Explicit SameSite override, `None` when the default (`Lax`) applies.
    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Path component of the login URL, used to detect requests that already
    /// target the login entry point.
    pub fn login_path(&self) -> &str {
        login_path_of(&self.login_url)
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub fn store(&self) -> &StoreBackend {
        &self.store
    }
}

fn login_path_of(url: &str) -> &str {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    let path = match without_scheme {
        Some(rest) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
        None => url,
    };
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

#[derive(Debug, Default, Clone)]
pub struct SessionConfigBuilder {
    cookie_name: Option<String>,
    timeout_secs: Option<u64>,
    secret: Option<String>,
    same_site: Option<SameSite>,
    login_url: Option<String>,
    store_timeout: Option<Duration>,
    store: Option<StoreBackend>,
}

impl SessionConfigBuilder {
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = Some(name.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = Some(url.into());
        self
    }

    pub fn store_timeout_ms(mut self, ms: u64) -> Self {
        self.store_timeout = Some(Duration::from_millis(ms));
        self
    }

    pub fn store(mut self, store: StoreBackend) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate every field and produce the immutable configuration.
    ///
    /// Cookie name, timeout and secret have no defaults: a silent fallback
    /// would desynchronize this component from the rest of the application.
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        let cookie_name = self
            .cookie_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ConfigError::new(
                    ConfigErrorCode::MissingCookieName,
                    format!("{ENV_SESSION_COOKIE_NAME} is not set"),
                )
            })?;
        if !is_cookie_token(&cookie_name) {
            return Err(ConfigError::new(
                ConfigErrorCode::InvalidCookieName,
                format!("{ENV_SESSION_COOKIE_NAME} contains characters not allowed in a cookie name"),
            ));
        }

        let timeout_secs = self.timeout_secs.ok_or_else(|| {
            ConfigError::new(
                ConfigErrorCode::MissingTimeout,
                format!("{ENV_SESSION_TIMEOUT} is not set"),
            )
        })?;
        if timeout_secs == 0 || timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::new(
                ConfigErrorCode::InvalidTimeout,
                format!(
                    "{ENV_SESSION_TIMEOUT} must be a positive integer no larger than {MAX_TIMEOUT_SECS}"
                ),
            ));
        }

        let secret = self
            .secret
            .filter(|s| !s.is_empty())
            .map(|s| SessionSecret(s.into_bytes()))
            .ok_or_else(|| {
                ConfigError::new(
                    ConfigErrorCode::MissingSecret,
                    format!("{ENV_SESSION_SECRET} is not set"),
                )
            })?;

        let store_timeout = self
            .store_timeout
            .unwrap_or(Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS));
        if store_timeout.is_zero() {
            return Err(ConfigError::new(
                ConfigErrorCode::InvalidStoreTimeout,
                format!("{ENV_SESSION_STORE_TIMEOUT_MS} must be a positive integer"),
            ));
        }

        let login_url = self
            .login_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string());

        if self.same_site == Some(SameSite::None) {
            tracing::warn!(
                "{ENV_SESSION_SAME_SITE}=None requires HTTPS; the Secure attribute will be set on every session cookie"
            );
        }

        Ok(SessionConfig {
            cookie_name,
            timeout_secs,
            secret,
            same_site: self.same_site,
            login_url,
            store_timeout,
            store: self.store.unwrap_or(StoreBackend::Memory),
        })
    }
}

// RFC 6265 cookie-name is an RFC 2616 token.
fn is_cookie_token(name: &str) -> bool {
    name.bytes().all(|b| {
        b.is_ascii_graphic()
            && !matches!(
                b,
                b'(' | b')'
                    | b'<'
                    | b'>'
                    | b'@'
                    | b','
                    | b';'
                    | b':'
                    | b'\\'
                    | b'"'
                    | b'/'
                    | b'['
                    | b']'
                    | b'?'
                    | b'='
                    | b'{'
                    | b'}'
            )
    })
}
