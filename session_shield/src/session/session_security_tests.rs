//! End-to-end checks of the request pipeline across several requests.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Duration;
use http::header::SET_COOKIE;
use http::{HeaderMap, HeaderValue};

use super::main::test_utils::{
    RevocablePrincipals, cookie_headers, cookie_value_from, counting_manager, memory_manager,
};
use super::{ActiveSession, RedirectTarget, RequestInfo, SessionManager, SessionOutcome};

fn manager() -> SessionManager {
    memory_manager(Arc::new(RevocablePrincipals::default()))
}

async fn visit(manager: &SessionManager, headers: &HeaderMap, path: &str) -> SessionOutcome {
    manager
        .begin(&RequestInfo {
            headers,
            path,
            native_secure: false,
        })
        .await
        .unwrap()
}

fn active(outcome: SessionOutcome) -> ActiveSession {
    match outcome {
        SessionOutcome::Continue(session) => session,
        SessionOutcome::Redirect { target, .. } => {
            panic!("Unexpected redirect to {}", target.location())
        }
    }
}

#[tokio::test]
async fn test_new_visitor_scenario() {
    let manager = manager();

    // First request: no cookie, plain HTTP.
    let session = active(visit(&manager, &HeaderMap::new(), "/").await);
    assert!(session.context().is_initialized());
    let token = session.csrf_token().to_string();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

    let headers = manager.commit(session).await.unwrap();
    let set_cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("Max-Age=3600"));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(!set_cookie.contains("Secure"));

    // Second request presents the cookie and submits the token.
    let cookie = cookie_headers(&cookie_value_from(&headers));
    let session = active(visit(&manager, &cookie, "/form").await);
    assert_eq!(session.csrf_token(), token);
    assert!(session.verify_csrf(&token));
    assert!(!session.verify_csrf(&token.to_uppercase()));
}

#[tokio::test]
async fn test_initialization_happens_once_with_one_rotation() {
    let (manager, rotations) = counting_manager(Arc::new(RevocablePrincipals::default()));
    let session = active(visit(&manager, &HeaderMap::new(), "/").await);
    assert!(session.context().is_initialized());
    assert_eq!(rotations.load(Ordering::SeqCst), 1);

    let id = session.context().session_id().to_string();
    let mut headers = manager.commit(session).await.unwrap();

    for _ in 0..3 {
        let cookie = cookie_headers(&cookie_value_from(&headers));
        let session = active(visit(&manager, &cookie, "/").await);
        assert_eq!(session.context().session_id(), id);
        assert!(session.context().is_initialized());
        headers = manager.commit(session).await.unwrap();
    }

    assert_eq!(rotations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_secure_flag_follows_forwarded_proto() {
    let manager = manager();
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-proto", HeaderValue::from_static("HTTPS"));

    let session = active(visit(&manager, &headers, "/").await);
    assert!(session.policy().secure);

    let set_cookie = manager.commit(session).await.unwrap();
    let value = set_cookie.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(value.ends_with("; Secure"));
}

#[tokio::test]
async fn test_planted_identifier_is_never_adopted() {
    let manager = manager();
    let planted = manager.store().signed_cookie(&"Z".repeat(43));

    let session = active(visit(&manager, &cookie_headers(&planted), "/").await);

    assert_ne!(session.context().session_id(), "Z".repeat(43));
}

#[tokio::test]
async fn test_idle_timeout_boundary() {
    let manager = manager();
    let mut session = active(visit(&manager, &HeaderMap::new(), "/login").await);
    manager.login(&mut session, "dana").await.unwrap();
    let validated_at = session.context().last_validated_at();
    let headers = manager.commit(session).await.unwrap();
    let cookie = cookie_headers(&cookie_value_from(&headers));

    let just_inside = manager
        .begin_at(
            &RequestInfo {
                headers: &cookie,
                path: "/reports",
                native_secure: false,
            },
            validated_at + Duration::seconds(3599),
        )
        .await
        .unwrap();
    assert!(matches!(just_inside, SessionOutcome::Continue(_)));

    // The successful check above was not committed, so the original
    // timestamp still governs.
    let too_late = manager
        .begin_at(
            &RequestInfo {
                headers: &cookie,
                path: "/reports",
                native_secure: false,
            },
            validated_at + Duration::seconds(3601),
        )
        .await
        .unwrap();
    match too_late {
        SessionOutcome::Redirect { target, .. } => {
            assert_eq!(target, RedirectTarget::expired("/login"))
        }
        SessionOutcome::Continue(_) => panic!("Expected expiry redirect"),
    }
}

#[tokio::test]
async fn test_replayed_cookie_after_logout_starts_over() {
    let manager = manager();
    let mut session = active(visit(&manager, &HeaderMap::new(), "/login").await);
    manager.login(&mut session, "erin").await.unwrap();
    let headers = manager.commit(session).await.unwrap();
    let cookie = cookie_headers(&cookie_value_from(&headers));

    let session = active(visit(&manager, &cookie, "/").await);
    let id = session.context().session_id().to_string();
    manager.logout(session).await.unwrap();

    let replay = active(visit(&manager, &cookie, "/").await);
    assert!(replay.principal().is_none());
    assert_ne!(replay.context().session_id(), id);
}
