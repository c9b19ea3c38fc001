//! Registration and login routes.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ethwatch_common::error::AppError;
use ethwatch_common::types::User;

use crate::middleware::auth::encode_jwt;
use crate::password;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// Name of the watchlist every new account starts with.
const DEFAULT_WATCHLIST_NAME: &str = "My Addresses";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for successful registration or login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub username: String,
}

/// POST /api/auth/register — Create a user, seed their default watchlist,
/// return a JWT.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if !req.email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(req.email.trim())
    .bind(&password_hash)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Validation("A user with this username or email already exists".to_string())
        }
        _ => AppError::Database(e),
    })?;

    // Every account starts with a default watchlist.
    sqlx::query(
        r#"
        INSERT INTO watchlists (id, user_id, name, description)
        VALUES ($1, $2, $3, 'Default watchlist for tracked addresses')
        ON CONFLICT (user_id, name) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(DEFAULT_WATCHLIST_NAME)
    .execute(&state.pool)
    .await?;

    let token = encode_jwt(
        user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
    }))
}

/// POST /api/auth/login — Verify credentials, return a JWT.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(req.username.trim())
        .fetch_optional(&state.pool)
        .await?;

    let user = match user {
        Some(u) if password::verify_password(&req.password, &u.password_hash)? => u,
        // Same error for unknown user and wrong password.
        _ => return Err(AppError::Auth("Invalid username or password".to_string())),
    };

    let token = encode_jwt(
        user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
    }))
}
