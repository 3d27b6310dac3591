use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    response::{IntoResponse, Response},
};
use http::{HeaderMap, Method, StatusCode, request::Parts};
use tokio::sync::Mutex;

use session_shield::{
    ActiveSession, Principal, RedirectTarget, SessionError, SessionManager,
    csrf_token_from_headers,
};

/// Handle to the current request's session, available as an axum extractor
/// wherever [`session_layer`](crate::session_layer) is installed.
///
/// Clones share the same session. After [`Session::logout`] the handle is
/// empty and every accessor returns `None`.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Option<ActiveSession>>>,
    manager: SessionManager,
}

impl Session {
    pub(crate) fn new(active: ActiveSession, manager: SessionManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(active))),
            manager,
        }
    }

    /// Anti-forgery token to embed in forms and send back as `X-CSRF-Token`.
    pub async fn csrf_token(&self) -> Option<String> {
        let guard = self.inner.lock().await;
        guard.as_ref().map(|s| s.csrf_token().to_string())
    }

    pub async fn principal(&self) -> Option<Principal> {
        let guard = self.inner.lock().await;
        guard.as_ref().and_then(|s| s.principal().cloned())
    }

    pub async fn verify_csrf(&self, submitted: &str) -> bool {
        let guard = self.inner.lock().await;
        guard.as_ref().is_some_and(|s| s.verify_csrf(submitted))
    }

    pub async fn require_csrf(&self, submitted: Option<&str>) -> Result<(), SessionError> {
        let guard = self.inner.lock().await;
        match guard.as_ref() {
            Some(s) => s.require_csrf(submitted),
            None => Err(SessionError::CsrfMismatch),
        }
    }

    /// Record a successful authentication. The session identifier is rotated.
    pub async fn login(&self, principal_id: impl Into<String>) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        let Some(active) = guard.as_mut() else {
            return Err(SessionError::Principal(
                "Session already ended".to_string(),
            ));
        };
        self.manager.login(active, principal_id).await
    }

    /// End the session now. The returned headers carry the removal cookie.
    pub async fn logout(&self) -> Result<(HeaderMap, RedirectTarget), SessionError> {
        let taken = self.inner.lock().await.take();
        match taken {
            Some(active) => self.manager.logout(active).await,
            None => Ok((
                HeaderMap::new(),
                RedirectTarget::logged_out(self.manager.config().login_url()),
            )),
        }
    }

    /// Commit whatever is left in the handle.
    pub(crate) async fn finish(&self) -> Result<HeaderMap, SessionError> {
        let taken = self.inner.lock().await.take();
        match taken {
            Some(active) => self.manager.commit(active).await,
            None => Ok(HeaderMap::new()),
        }
    }
}

/// Rejection when the extractor runs without the session layer.
#[derive(Debug)]
pub struct MissingSessionLayer;

impl IntoResponse for MissingSessionLayer {
    fn into_response(self) -> Response {
        tracing::error!("Session extractor used on a route without session_layer");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = MissingSessionLayer;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(MissingSessionLayer)
    }
}

fn is_state_changing(method: &Method) -> bool {
    *method == Method::POST
        || *method == Method::PUT
        || *method == Method::PATCH
        || *method == Method::DELETE
}

/// A [`Session`] whose `X-CSRF-Token` header has been checked.
///
/// State-changing requests (POST, PUT, PATCH, DELETE) without a matching
/// header are rejected with 403. Form posts that carry the token in the body
/// should take [`Session`] and call [`Session::require_csrf`] instead.
pub struct CsrfProtected(pub Session);

pub enum CsrfRejection {
    MissingSessionLayer,
    Mismatch,
}

impl IntoResponse for CsrfRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingSessionLayer => MissingSessionLayer.into_response(),
            Self::Mismatch => (StatusCode::FORBIDDEN, "CSRF token mismatch").into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for CsrfProtected
where
    S: Send + Sync,
{
    type Rejection = CsrfRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| CsrfRejection::MissingSessionLayer)?;

        if is_state_changing(&parts.method) {
            let submitted = csrf_token_from_headers(&parts.headers);
            if session.require_csrf(submitted).await.is_err() {
                tracing::warn!("Rejecting {} request without a valid CSRF header", parts.method);
                return Err(CsrfRejection::Mismatch);
            }
            tracing::trace!("CSRF token via X-CSRF-Token header verified.");
        }

        Ok(CsrfProtected(session))
    }
}
