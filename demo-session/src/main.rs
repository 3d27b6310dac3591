use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_shield_axum::{AlwaysValid, SessionConfig, SessionManager, logout, session_layer};

mod handlers;

use crate::handlers::{index, login_form, login_submit, protected, update};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=debug,session_shield=debug,session_shield_axum=debug",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SessionConfig::from_env().inspect_err(|e| {
        tracing::error!("{}", e);
    })?;
    let manager = SessionManager::from_config(config, Arc::new(AlwaysValid)).await?;

    let app = Router::new()
        .route("/", get(index))
        .route("/login", get(login_form).post(login_submit))
        .route("/protected", get(protected))
        .route("/api/update", post(update))
        .route("/logout", get(logout))
        .layer(from_fn_with_state(manager, session_layer));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
