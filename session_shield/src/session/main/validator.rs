use chrono::{DateTime, Duration, Utc};

use crate::config::SessionConfig;
use crate::session::errors::SessionError;
use crate::session::types::{InvalidReason, RedirectTarget, SessionContext, Validation};

use super::principal::PrincipalValidator;
use super::store::SessionStore;

/// Re-check an authenticated session at `now`.
///
/// Inactive for strictly longer than `timeout_secs`, or revoked by the
/// principal collaborator, means invalid. A collaborator failure also means
/// invalid. On success `last_validated_at` moves to `now`. A session without a
/// principal has nothing to expire and is reported valid untouched.
pub async fn validate_at(
    ctx: &mut SessionContext,
    now: DateTime<Utc>,
    timeout_secs: u64,
    principals: &dyn PrincipalValidator,
) -> Validation {
    let Some(principal) = ctx.principal.as_ref() else {
        return Validation::Valid;
    };

    let elapsed = now - ctx.last_validated_at;
    if elapsed > Duration::seconds(timeout_secs as i64) {
        tracing::debug!(
            "Session inactive for {}s, timeout is {}s",
            elapsed.num_seconds(),
            timeout_secs
        );
        return Validation::Invalid(InvalidReason::Expired);
    }

    match principals.is_still_valid(principal).await {
        Ok(true) => {}
        Ok(false) => return Validation::Invalid(InvalidReason::Revoked),
        Err(e) => {
            tracing::error!("Principal check failed: {}", e);
            return Validation::Invalid(InvalidReason::Unavailable);
        }
    }

    ctx.last_validated_at = now;
    Validation::Valid
}

/// Whether `path` is the login entry point itself.
pub fn is_login_request(path: &str, login_path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let normalized = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    normalized == login_path
}

/// Validate an authenticated session and terminate it when it fails.
///
/// On failure the session is destroyed through the store, then the caller is
/// told where to redirect. No redirect is produced for a request that already
/// targets the login entry point, so an expired session cannot loop.
pub async fn enforce_at(
    store: &SessionStore,
    ctx: &mut SessionContext,
    request_path: &str,
    config: &SessionConfig,
    principals: &dyn PrincipalValidator,
    now: DateTime<Utc>,
) -> Result<Option<RedirectTarget>, SessionError> {
    if !principals.is_authenticated(ctx) {
        return Ok(None);
    }

    let reason = match validate_at(ctx, now, config.timeout_secs(), principals).await {
        Validation::Valid => return Ok(None),
        Validation::Invalid(reason) => reason,
    };

    tracing::warn!("Session invalidated: {}", reason.as_str());
    store.destroy(ctx).await?;

    if is_login_request(request_path, config.login_path()) {
        tracing::debug!("Already on the login entry point; not redirecting");
        return Ok(None);
    }

    Ok(Some(RedirectTarget::expired(config.login_url())))
}
