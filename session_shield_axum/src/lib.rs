//! session_shield_axum - Axum integration for session_shield
//!
//! Install [`session_layer`] with `axum::middleware::from_fn_with_state`,
//! then take [`Session`] or [`CsrfProtected`] in handlers.

mod error;
mod logout;
mod middleware;
mod session;

pub use error::{IntoResponseError, SessionRejection};
pub use logout::logout;
pub use middleware::{NativeTls, session_layer};
pub use session::{CsrfProtected, CsrfRejection, MissingSessionLayer, Session};

pub use session_shield::{
    AlwaysValid, Principal, PrincipalValidator, RedirectTarget, SessionConfig, SessionError,
    SessionManager,
};
