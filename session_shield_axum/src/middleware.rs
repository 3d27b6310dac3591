use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use http::uri::Scheme;

use session_shield::{RequestInfo, SessionManager, SessionOutcome};

use super::error::SessionRejection;
use super::session::Session;

/// Request extension set by a TLS-terminating listener in this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTls;

fn is_native_secure(req: &Request) -> bool {
    req.extensions().get::<NativeTls>().is_some() || req.uri().scheme() == Some(&Scheme::HTTPS)
}

/// Runs the session pipeline around every request.
///
/// Use with `axum::middleware::from_fn_with_state(manager, session_layer)`.
/// The session is committed after the handler returns and before the response
/// leaves this layer, so `Set-Cookie` is always in place ahead of the body.
pub async fn session_layer(
    State(manager): State<SessionManager>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let native_secure = is_native_secure(&req);

    let outcome = manager
        .begin(&RequestInfo {
            headers: req.headers(),
            path: &path,
            native_secure,
        })
        .await;

    let active = match outcome {
        Ok(SessionOutcome::Continue(active)) => active,
        Ok(SessionOutcome::Redirect { target, headers }) => {
            tracing::debug!("Redirecting to {}", target.url());
            return (headers, Redirect::to(&target.location())).into_response();
        }
        Err(e) => {
            return SessionRejection::new(e)
                .with_recovery(manager.recovery_redirect(&path))
                .into_response();
        }
    };

    let session = Session::new(active, manager.clone());
    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;

    match session.finish().await {
        Ok(headers) => {
            for (name, value) in headers.iter() {
                response.headers_mut().append(name, value.clone());
            }
            response
        }
        Err(e) => SessionRejection::new(e)
            .with_recovery(manager.recovery_redirect(&path))
            .into_response(),
    }
}
