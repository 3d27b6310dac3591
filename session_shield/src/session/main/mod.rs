mod cookie;
mod csrf;
mod fixation;
mod pipeline;
mod principal;
mod signing;
mod store;
mod transport;
mod validator;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cookie::build_cookie_policy;
pub use csrf::{
    CSRF_HEADER, csrf_token_from_headers, ensure_csrf_token, require_csrf_token,
    verify_csrf_token,
};
pub use fixation::guard_fixation;
pub use pipeline::{ActiveSession, SessionManager, SessionOutcome};
pub use principal::{AlwaysValid, PrincipalValidator};
pub use store::SessionStore;
pub use transport::{X_FORWARDED_PROTO, inspect_transport};
pub use validator::{enforce_at, is_login_request, validate_at};
