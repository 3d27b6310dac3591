use crate::session::errors::SessionError;
use crate::session::types::SessionContext;

use super::store::SessionStore;

/// Give a not-yet-initialized session a fresh identifier before it is trusted.
///
/// An identifier planted in the victim's browser therefore never becomes the one
/// privileges accrue under. Returns whether a regeneration happened; once the
/// session is initialized this is a no-op.
pub async fn guard_fixation(
    store: &SessionStore,
    ctx: &mut SessionContext,
) -> Result<bool, SessionError> {
    if ctx.initialized {
        return Ok(false);
    }

    store.regenerate_id(ctx).await?;
    ctx.initialized = true;
    tracing::debug!("Fixation guard issued a fresh session identifier");
    Ok(true)
}
