//! Notification inbox and preference routes.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use ethwatch_common::error::AppError;
use ethwatch_common::types::{Notification, NotificationPreference};
use ethwatch_notify::preferences::{self, UpdatePreferences};
use ethwatch_notify::NotificationService;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/count", get(unread_count))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route(
            "/api/notifications/preferences",
            get(get_preferences).put(put_preferences),
        )
        .route("/api/notifications/{id}/read", post(mark_read))
}

const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub notifications: Vec<Notification>,
    pub unread_remaining: i64,
}

/// GET /api/notifications — The user's inbox, newest first.
///
/// Viewing the inbox marks the returned unread rows as read, so the page
/// the user just saw never counts as unread again.
async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut notifications: Vec<Notification> = sqlx::query_as(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(auth.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let unread_ids: Vec<Uuid> = notifications
        .iter()
        .filter(|n| !n.is_read)
        .map(|n| n.id)
        .collect();
    if !unread_ids.is_empty() {
        let now = chrono::Utc::now();
        sqlx::query(
            r#"
            UPDATE notifications SET is_read = true, read_at = $1
            WHERE id = ANY($2) AND user_id = $3
            "#,
        )
        .bind(now)
        .bind(&unread_ids)
        .bind(auth.user_id)
        .execute(&state.pool)
        .await?;

        for n in notifications.iter_mut().filter(|n| !n.is_read) {
            n.is_read = true;
            n.read_at = Some(now);
        }
    }

    let unread_remaining = NotificationService::unread_count(&state.pool, auth.user_id).await?;

    Ok(Json(ListResponse {
        notifications,
        unread_remaining,
    }))
}

/// GET /api/notifications/count — Unread badge count.
async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let count = NotificationService::unread_count(&state.pool, auth.user_id).await?;
    Ok(Json(json!({ "count": count })))
}

/// POST /api/notifications/:id/read — Mark one notification as read.
async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = NotificationService::mark_read(&state.pool, auth.user_id, notification_id).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// POST /api/notifications/read-all — Mark every unread notification as
/// read.
async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = NotificationService::mark_all_read(&state.pool, auth.user_id).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// GET /api/notifications/preferences — The user's preference row, created
/// with defaults on first access.
async fn get_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<NotificationPreference>, AppError> {
    let prefs = preferences::get_or_create(&state.pool, auth.user_id).await?;
    Ok(Json(prefs))
}

/// PUT /api/notifications/preferences — Partial preference update; omitted
/// fields are left untouched.
async fn put_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(params): Json<UpdatePreferences>,
) -> Result<Json<NotificationPreference>, AppError> {
    let prefs = preferences::update(&state.pool, auth.user_id, &params).await?;
    Ok(Json(prefs))
}
