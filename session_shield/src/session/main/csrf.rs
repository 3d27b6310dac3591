use http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::session::errors::SessionError;
use crate::session::types::SessionContext;
use crate::utils::gen_random_hex;

pub const CSRF_HEADER: &str = "x-csrf-token";
const CSRF_TOKEN_BYTES: usize = 32;

/// Make sure the session carries an anti-forgery token and return it.
///
/// A token is generated once per session and then left alone; replacing it
/// would break forms already open in other tabs.
pub fn ensure_csrf_token(ctx: &mut SessionContext) -> Result<&str, SessionError> {
    if ctx.csrf_token.is_empty() {
        ctx.csrf_token = gen_random_hex(CSRF_TOKEN_BYTES)?;
        tracing::debug!("Issued CSRF token for session");
    }
    Ok(ctx.csrf_token.as_str())
}

/// Compare a submitted token with the session's in constant time.
pub fn verify_csrf_token(submitted: &str, ctx: &SessionContext) -> bool {
    if ctx.csrf_token.is_empty() {
        return false;
    }
    submitted
        .as_bytes()
        .ct_eq(ctx.csrf_token.as_bytes())
        .into()
}

/// Like [`verify_csrf_token`], but a mismatch is an authorization failure.
pub fn require_csrf_token(submitted: Option<&str>, ctx: &SessionContext) -> Result<(), SessionError> {
    match submitted {
        Some(token) if verify_csrf_token(token, ctx) => Ok(()),
        Some(_) => {
            tracing::warn!("CSRF token mismatch");
            Err(SessionError::CsrfMismatch)
        }
        None => {
            tracing::warn!("No CSRF token submitted");
            Err(SessionError::CsrfMismatch)
        }
    }
}

/// Token sent in the `X-CSRF-Token` request header, if any.
pub fn csrf_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers.get(CSRF_HEADER).and_then(|h| h.to_str().ok())
}
