use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{self, AuthUser};
use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "please include a valid email".to_string(),
        ));
    }
    if payload.password.len() < 6 {
        return Err(AppError::Validation(
            "password must be 6 or more characters".to_string(),
        ));
    }
    if state.store.user_by_email(&email).is_some() {
        return Err(AppError::Conflict("user already exists".to_string()));
    }

    let user = User {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        email,
        password_hash: auth::hash_password(&payload.password)?,
        role: payload.role.unwrap_or(Role::Rider),
        active: true,
        created_at: Utc::now(),
    };

    let token = auth::issue_token(
        &state.config.jwt_secret,
        state.config.token_ttl_minutes,
        user.id,
        user.role,
    )?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    state.store.users.insert(user.id, user.clone());

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = payload.email.trim().to_lowercase();
    let user = state
        .store
        .user_by_email(&email)
        .ok_or_else(|| AppError::Unauthenticated("invalid credentials".to_string()))?;

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(AppError::Unauthenticated("invalid credentials".to_string()));
    }
    if !user.active {
        return Err(AppError::Unauthenticated(
            "user account is inactive".to_string(),
        ));
    }

    let token = auth::issue_token(
        &state.config.jwt_secret,
        state.config.token_ttl_minutes,
        user.id,
        user.role,
    )?;

    Ok(Json(AuthResponse { token, user }))
}

async fn me(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
) -> Result<Json<User>, AppError> {
    let user = state
        .store
        .users
        .get(&caller.id)
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    Ok(Json(user.clone()))
}
