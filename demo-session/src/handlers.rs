use axum::{
    Form,
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use session_shield_axum::{CsrfProtected, IntoResponseError, Session};

#[derive(Deserialize)]
pub(crate) struct LoginNotice {
    expired: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    username: String,
    csrf_token: String,
}

// Keeps user input safe to drop into HTML without an escaper.
fn is_valid_username(name: &str) -> bool {
    !name.is_empty() && name.len() <= 32 && name.chars().all(|c| c.is_ascii_alphanumeric())
}

pub(crate) async fn index(session: Session) -> Html<String> {
    let greeting = match session.principal().await {
        Some(p) => format!("Hey {}! <a href=\"/protected\">Protected page</a>", p.id),
        None => "Not logged in. <a href=\"/login\">Login</a>".to_string(),
    };
    Html(format!("<h1>session-shield demo</h1><p>{greeting}</p>"))
}

pub(crate) async fn login_form(session: Session, Query(notice): Query<LoginNotice>) -> Html<String> {
    let banner = if notice.expired.is_some() {
        "<p>Your session has expired. Please log in again.</p>"
    } else if notice.message.is_some() {
        "<p>You have been logged out.</p>"
    } else {
        ""
    };
    let token = session.csrf_token().await.unwrap_or_default();
    Html(format!(
        "<h1>Login</h1>{banner}\
         <form method=\"post\" action=\"/login\">\
         <input name=\"username\" placeholder=\"username\">\
         <input type=\"hidden\" name=\"csrf_token\" value=\"{token}\">\
         <button type=\"submit\">Login</button></form>"
    ))
}

pub(crate) async fn login_submit(session: Session, Form(form): Form<LoginForm>) -> Response {
    if let Err((status, message)) = session
        .require_csrf(Some(&form.csrf_token))
        .await
        .into_response_error()
    {
        return (status, message).into_response();
    }
    if !is_valid_username(&form.username) {
        return (StatusCode::BAD_REQUEST, "Invalid username").into_response();
    }

    match session.login(form.username).await.into_response_error() {
        Ok(()) => Redirect::to("/protected").into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn protected(session: Session) -> Response {
    let Some(principal) = session.principal().await else {
        tracing::debug!("Anonymous request to protected page");
        return Redirect::to("/login").into_response();
    };
    let token = session.csrf_token().await.unwrap_or_default();
    Html(format!(
        "<h1>Protected</h1><p>Logged in as {} since {}.</p>\
         <p>API calls must send <code>X-CSRF-Token: {token}</code>.</p>\
         <a href=\"/logout\">Logout</a>",
        principal.id, principal.authenticated_at
    ))
    .into_response()
}

pub(crate) async fn update(CsrfProtected(session): CsrfProtected) -> Response {
    match session.principal().await {
        Some(p) => format!("Updated by {}", p.id).into_response(),
        None => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    }
}
