use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::HeaderMap;

use crate::config::SessionConfig;
use crate::session::errors::SessionError;
use crate::session::types::{
    CookiePolicy, Principal, RedirectTarget, RequestInfo, SessionContext,
};

use super::cookie::build_cookie_policy;
use super::csrf::{ensure_csrf_token, require_csrf_token, verify_csrf_token};
use super::fixation::guard_fixation;
use super::principal::PrincipalValidator;
use super::store::SessionStore;
use super::transport::inspect_transport;
use super::validator::{enforce_at, is_login_request};

/// A session that passed the pipeline, together with the cookie policy
/// computed for this request.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    ctx: SessionContext,
    policy: CookiePolicy,
}

impl ActiveSession {
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn policy(&self) -> &CookiePolicy {
        &self.policy
    }

    pub fn csrf_token(&self) -> &str {
        self.ctx.csrf_token()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.ctx.principal()
    }

    pub fn verify_csrf(&self, submitted: &str) -> bool {
        verify_csrf_token(submitted, &self.ctx)
    }

    pub fn require_csrf(&self, submitted: Option<&str>) -> Result<(), SessionError> {
        require_csrf_token(submitted, &self.ctx)
    }
}

/// Result of running the pipeline for one request.
#[derive(Debug)]
pub enum SessionOutcome {
    /// Hand the session to the request handler, then `commit` it.
    Continue(ActiveSession),
    /// The session was terminated. Send `headers` along with the redirect.
    Redirect {
        target: RedirectTarget,
        headers: HeaderMap,
    },
}

/// Runs transport inspection, cookie policy, open, fixation guard, CSRF token
/// issue and validation for every request.
#[derive(Clone)]
pub struct SessionManager {
    config: Arc<SessionConfig>,
    store: SessionStore,
    principals: Arc<dyn PrincipalValidator>,
}

impl SessionManager {
    pub fn new(
        config: Arc<SessionConfig>,
        store: SessionStore,
        principals: Arc<dyn PrincipalValidator>,
    ) -> Self {
        Self {
            config,
            store,
            principals,
        }
    }

    /// Connect to the configured store and build a manager around it.
    pub async fn from_config(
        config: SessionConfig,
        principals: Arc<dyn PrincipalValidator>,
    ) -> Result<Self, SessionError> {
        let store = SessionStore::connect(&config).await?;
        Ok(Self::new(Arc::new(config), store, principals))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[tracing::instrument(skip_all, fields(path = %request.path))]
    pub async fn begin(&self, request: &RequestInfo<'_>) -> Result<SessionOutcome, SessionError> {
        self.begin_at(request, Utc::now()).await
    }

    pub(crate) async fn begin_at(
        &self,
        request: &RequestInfo<'_>,
        now: DateTime<Utc>,
    ) -> Result<SessionOutcome, SessionError> {
        let transport = inspect_transport(request.native_secure, request.headers);
        let policy = build_cookie_policy(&transport, &self.config);

        let mut ctx = self.store.open_at(request.headers, &policy, now).await?;
        self.prepare(&mut ctx).await?;

        let redirect = enforce_at(
            &self.store,
            &mut ctx,
            request.path,
            &self.config,
            self.principals.as_ref(),
            now,
        )
        .await?;

        if let Some(target) = redirect {
            let headers = self.store.commit(ctx, &policy).await?;
            return Ok(SessionOutcome::Redirect { target, headers });
        }

        if ctx.is_destroyed() {
            // Expired while on the login page: continue with a clean session so
            // the login form still gets a CSRF token.
            ctx = self.store.open_at(&HeaderMap::new(), &policy, now).await?;
            self.prepare(&mut ctx).await?;
        }

        Ok(SessionOutcome::Continue(ActiveSession { ctx, policy }))
    }

    async fn prepare(&self, ctx: &mut SessionContext) -> Result<(), SessionError> {
        guard_fixation(&self.store, ctx).await?;
        ensure_csrf_token(ctx)?;
        Ok(())
    }

    /// Attach an authenticated principal after a successful login.
    ///
    /// Privilege changes, so the identifier is rotated again.
    pub async fn login(
        &self,
        session: &mut ActiveSession,
        principal_id: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.store.regenerate_id(&mut session.ctx).await?;
        let now = Utc::now();
        session.ctx.principal = Some(Principal {
            id: principal_id.into(),
            authenticated_at: now,
        });
        session.ctx.last_validated_at = now;
        tracing::info!("Principal attached to session");
        Ok(())
    }

    /// Terminate the session and point the user back at the login entry point.
    pub async fn logout(
        &self,
        mut session: ActiveSession,
    ) -> Result<(HeaderMap, RedirectTarget), SessionError> {
        self.store.destroy(&mut session.ctx).await?;
        let headers = self.store.commit(session.ctx, &session.policy).await?;
        tracing::info!("Session logged out");
        Ok((headers, RedirectTarget::logged_out(self.config.login_url())))
    }

    pub async fn destroy(&self, session: &mut ActiveSession) -> Result<(), SessionError> {
        self.store.destroy(&mut session.ctx).await
    }

    /// Write the session back and return the `Set-Cookie` header.
    pub async fn commit(&self, session: ActiveSession) -> Result<HeaderMap, SessionError> {
        self.store.commit(session.ctx, &session.policy).await
    }

    /// Where to send a user whose request failed with a recoverable error.
    ///
    /// `None` when the request already targets the login entry point.
    pub fn recovery_redirect(&self, request_path: &str) -> Option<RedirectTarget> {
        if is_login_request(request_path, self.config.login_path()) {
            None
        } else {
            Some(RedirectTarget::expired(self.config.login_url()))
        }
    }
}
