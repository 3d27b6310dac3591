mod errors;
mod main;
mod types;

pub use errors::SessionError;
pub use main::{
    ActiveSession, AlwaysValid, CSRF_HEADER, PrincipalValidator, SessionManager, SessionOutcome,
    SessionStore, X_FORWARDED_PROTO, build_cookie_policy, csrf_token_from_headers, enforce_at,
    ensure_csrf_token, guard_fixation, inspect_transport, is_login_request, require_csrf_token,
    validate_at, verify_csrf_token,
};
pub use types::{
    CookiePolicy, InvalidReason, Principal, RedirectTarget, RequestInfo, SameSite,
    SessionContext, SessionState, TransportState, Validation,
};

#[cfg(test)]
mod session_security_tests;
