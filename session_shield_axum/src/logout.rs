use axum::response::{IntoResponse, Redirect, Response};

use super::error::SessionRejection;
use super::session::Session;

/// Handles logout requests
///
/// Destroys the session, clears the cookie and redirects to the login entry
/// point with the logout notice.
pub async fn logout(session: Session) -> Response {
    match session.logout().await {
        Ok((headers, target)) => {
            tracing::debug!("Redirecting to {}", target.url());
            (headers, Redirect::to(&target.location())).into_response()
        }
        Err(e) => SessionRejection::new(e).into_response(),
    }
}
