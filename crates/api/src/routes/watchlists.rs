//! Watchlist routes: create, list, and add addresses to a specific list.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ethwatch_common::error::AppError;
use ethwatch_common::types::{WatchList, WatchlistEntry};
use ethwatch_sync::service::SyncService;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/watchlists", post(create_watchlist).get(list_watchlists))
        .route("/api/watchlists/{id}/addresses", post(add_to_watchlist))
}

#[derive(Debug, Deserialize)]
pub struct CreateWatchlistRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddToWatchlistRequest {
    pub address: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddToWatchlistResponse {
    pub entry: WatchlistEntry,
    pub address: String,
}

/// POST /api/watchlists — Create a named watchlist for the authenticated
/// user. Names are unique per user.
async fn create_watchlist(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateWatchlistRequest>,
) -> Result<Json<WatchList>, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Watchlist name is required".to_string()));
    }

    let watchlist: WatchList = sqlx::query_as(
        r#"
        INSERT INTO watchlists (id, user_id, name, description)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.user_id)
    .bind(name)
    .bind(req.description.unwrap_or_default())
    .fetch_one(&state.pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Validation(format!("You already have a watchlist named {}", name))
        }
        _ => AppError::Database(e),
    })?;

    tracing::info!(watchlist_id = %watchlist.id, user_id = %auth.user_id, "Watchlist created");

    Ok(Json(watchlist))
}

/// GET /api/watchlists — All watchlists owned by the authenticated user.
async fn list_watchlists(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<WatchList>>, AppError> {
    let watchlists: Vec<WatchList> =
        sqlx::query_as("SELECT * FROM watchlists WHERE user_id = $1 ORDER BY created_at")
            .bind(auth.user_id)
            .fetch_all(&state.pool)
            .await?;

    Ok(Json(watchlists))
}

/// POST /api/watchlists/:id/addresses — Link an address into one of the
/// user's watchlists. Re-adding an address that is already in the list is
/// a no-op that returns the existing entry.
async fn add_to_watchlist(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(watchlist_id): Path<Uuid>,
    Json(req): Json<AddToWatchlistRequest>,
) -> Result<Json<AddToWatchlistResponse>, AppError> {
    let watchlist: Option<WatchList> =
        sqlx::query_as("SELECT * FROM watchlists WHERE id = $1 AND user_id = $2")
            .bind(watchlist_id)
            .bind(auth.user_id)
            .fetch_optional(&state.pool)
            .await?;
    let watchlist = watchlist
        .ok_or_else(|| AppError::NotFound(format!("Watchlist {} not found", watchlist_id)))?;

    let addr = SyncService::get_or_create_address(&state.pool, &req.address).await?;

    let entry: WatchlistEntry = sqlx::query_as(
        r#"
        INSERT INTO watchlist_entries (id, watchlist_id, address_id, notes)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (watchlist_id, address_id)
            DO UPDATE SET notes = watchlist_entries.notes
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(watchlist.id)
    .bind(addr.id)
    .bind(req.notes.unwrap_or_default())
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(
        watchlist_id = %watchlist.id,
        address = %addr.address,
        "Address added to watchlist"
    );

    Ok(Json(AddToWatchlistResponse {
        entry,
        address: addr.address,
    }))
}
