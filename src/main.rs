use std::sync::Arc;

use chrono::Utc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use dispatch_admin::auth;
use dispatch_admin::config::Config;
use dispatch_admin::error::AppError;
use dispatch_admin::models::user::{Role, User};
use dispatch_admin::state::AppState;
use dispatch_admin::api;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let state = Arc::new(AppState::new(config.clone()));
    seed_admin(&state)?;

    let app = api::rest::router(state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

/// Bootstraps a single admin account from the environment so a fresh
/// deployment has a caller that can create everything else.
fn seed_admin(state: &AppState) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (
        state.config.admin_email.clone(),
        state.config.admin_password.clone(),
    ) else {
        return Ok(());
    };

    let email = email.trim().to_lowercase();
    if state.store.user_by_email(&email).is_some() {
        return Ok(());
    }

    let user = User {
        id: Uuid::new_v4(),
        name: "Administrator".to_string(),
        email: email.clone(),
        password_hash: auth::hash_password(&password)?,
        role: Role::Admin,
        active: true,
        created_at: Utc::now(),
    };
    state.store.users.insert(user.id, user);

    tracing::info!(email, "seeded admin account");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
