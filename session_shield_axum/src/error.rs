use axum::response::{IntoResponse, Redirect, Response};
use http::StatusCode;

use session_shield::{RedirectTarget, SessionError};

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

impl<T> IntoResponseError<T> for Result<T, SessionError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            let status = match &e {
                SessionError::Configuration(_) | SessionError::StoreUnavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                SessionError::CsrfMismatch => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, public_message(&e))
        })
    }
}

// Never echo internal detail to the client.
fn public_message(err: &SessionError) -> String {
    match err {
        SessionError::Configuration(e) => format!(
            "A critical server configuration error occurred. Please contact support. (Error Code: {})",
            e.code
        ),
        SessionError::StoreUnavailable(_) => {
            "Session service is temporarily unavailable".to_string()
        }
        SessionError::CsrfMismatch => "CSRF token mismatch".to_string(),
        _ => "Internal server error".to_string(),
    }
}

/// A session failure turned into a response.
///
/// Recoverable failures with a `recovery` target send the user back to the
/// login entry point; everything else becomes a status code.
#[derive(Debug)]
pub struct SessionRejection {
    pub error: SessionError,
    pub recovery: Option<RedirectTarget>,
}

impl SessionRejection {
    pub fn new(error: SessionError) -> Self {
        Self {
            error,
            recovery: None,
        }
    }

    pub fn with_recovery(mut self, recovery: Option<RedirectTarget>) -> Self {
        self.recovery = recovery;
        self
    }
}

impl From<SessionError> for SessionRejection {
    fn from(error: SessionError) -> Self {
        Self::new(error)
    }
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        tracing::error!("Session error: {}", self.error);
        match self.recovery {
            Some(target) if self.error.is_recoverable() => {
                Redirect::to(&target.location()).into_response()
            }
            _ => Err::<(), _>(self.error).into_response_error().into_response(),
        }
    }
}
