//! Tamper-evident session cookie values
//!
//! The cookie carries `<session_id>.<tag>` where the tag is an HMAC-SHA256 of
//! the identifier under the configured secret. Forged or truncated values are
//! rejected before the store is consulted.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::SessionSecret;
use crate::session::errors::SessionError;
use crate::utils::{base64url_decode, base64url_encode};

type HmacSha256 = Hmac<Sha256>;

/// Length of a base64url encoded 32-byte identifier.
pub(super) const SESSION_ID_LEN: usize = 43;

fn mac_for(secret: &SessionSecret) -> Result<HmacSha256, SessionError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SessionError::Crypto("Invalid HMAC key".to_string()))
}

pub(super) fn is_well_formed_session_id(id: &str) -> bool {
    id.len() == SESSION_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

pub(super) fn sign_session_id(
    secret: &SessionSecret,
    session_id: &str,
) -> Result<String, SessionError> {
    let mut mac = mac_for(secret)?;
    mac.update(session_id.as_bytes());
    let tag = mac.finalize().into_bytes();
    Ok(format!("{session_id}.{}", base64url_encode(&tag)))
}

/// Return the identifier inside a signed cookie value if the tag verifies.
pub(super) fn verify_signed_session_id<'a>(
    secret: &SessionSecret,
    cookie_value: &'a str,
) -> Option<&'a str> {
    let (session_id, tag) = cookie_value.rsplit_once('.')?;
    if !is_well_formed_session_id(session_id) {
        return None;
    }
    let tag = base64url_decode(tag).ok()?;
    let mut mac = mac_for(secret).ok()?;
    mac.update(session_id.as_bytes());
    // verify_slice compares in constant time
    mac.verify_slice(&tag).ok()?;
    Some(session_id)
}
