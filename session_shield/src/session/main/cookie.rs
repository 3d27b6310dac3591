use http::header::{HeaderMap, HeaderValue, SET_COOKIE};

use crate::config::SessionConfig;
use crate::session::errors::SessionError;
use crate::session::types::{CookiePolicy, SameSite, TransportState};

const COOKIE_PATH: &str = "/";

/// Derive the session cookie attributes for this request.
///
/// `SameSite=None` is only honoured by browsers together with `Secure`, so an
/// explicit `None` override forces `secure` regardless of transport detection.
/// The configuration warning for that override is logged once, when the
/// configuration is built.
pub fn build_cookie_policy(transport: &TransportState, config: &SessionConfig) -> CookiePolicy {
    let same_site = config.same_site().unwrap_or(SameSite::Lax);
    let secure = same_site == SameSite::None || transport.is_secure;

    CookiePolicy {
        secure,
        http_only: true,
        same_site,
        max_age: config.timeout_secs(),
        name: config.cookie_name().to_string(),
        path: COOKIE_PATH.to_string(),
    }
}

impl CookiePolicy {
    fn render(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path={}",
            self.name, value, max_age, self.path
        );
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.same_site.as_str());
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value carrying `value` for the configured lifetime.
    pub fn set_cookie_value(&self, value: &str) -> String {
        self.render(value, self.max_age)
    }

    /// `Set-Cookie` value that makes the browser drop the session cookie.
    pub fn removal_value(&self) -> String {
        self.render("", 0)
    }
}

pub(super) fn header_set_cookie(headers: &mut HeaderMap, cookie: String) -> Result<(), SessionError> {
    let value = HeaderValue::from_str(&cookie)
        .map_err(|_| SessionError::Cookie("Failed to build Set-Cookie header".to_string()))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}
