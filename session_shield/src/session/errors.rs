use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    /// Missing or invalid configuration. Not recoverable within a request.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Backing store unreachable, timed out or returned garbage. Treated as an
    /// invalid session, never as "no session needed".
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    /// Submitted anti-forgery token missing or not equal to the session's.
    #[error("CSRF token mismatch")]
    CsrfMismatch,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Cookie error: {0}")]
    Cookie(String),

    #[error("Header error: {0}")]
    HeaderError(String),

    /// Error from the principal collaborator
    #[error("Principal error: {0}")]
    Principal(String),
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<UtilError> for SessionError {
    fn from(err: UtilError) -> Self {
        match err {
            UtilError::Crypto(msg) => Self::Crypto(msg),
            UtilError::Format(msg) => Self::Cookie(msg),
        }
    }
}

impl SessionError {
    /// Whether the request can continue by sending the user back to log in.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}
