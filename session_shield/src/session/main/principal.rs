use async_trait::async_trait;

use crate::session::errors::SessionError;
use crate::session::types::{Principal, SessionContext};

/// Answers from the user store about the principal behind a session.
#[async_trait]
pub trait PrincipalValidator: Send + Sync + 'static {
    /// Whether the session is carrying an authenticated principal.
    fn is_authenticated(&self, ctx: &SessionContext) -> bool {
        ctx.principal().is_some()
    }

    /// Whether the principal is still allowed to hold a session, e.g. the account
    /// is not disabled and the password has not changed since login.
    async fn is_still_valid(&self, principal: &Principal) -> Result<bool, SessionError>;
}

/// Accepts every principal. For applications without revocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysValid;

#[async_trait]
impl PrincipalValidator for AlwaysValid {
    async fn is_still_valid(&self, _principal: &Principal) -> Result<bool, SessionError> {
        Ok(true)
    }
}
