//! Alert rule routes.

use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use ethwatch_common::error::AppError;
use ethwatch_common::types::{Alert, AlertType};
use ethwatch_notify::{AlertService, CreateAlertParams};
use ethwatch_sync::service::SyncService;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/alerts", post(create_alert).get(list_alerts))
        .route("/api/alerts/{id}", delete(delete_alert))
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub address: String,
    pub alert_type: AlertType,
    pub threshold: Option<Decimal>,
}

/// POST /api/alerts — Create an alert rule on an address. The address is
/// tracked on the fly when not yet known.
async fn create_alert(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateAlertRequest>,
) -> Result<Json<Alert>, AppError> {
    let addr = SyncService::get_or_create_address(&state.pool, &req.address).await?;

    let alert = AlertService::create(
        &state.pool,
        auth.user_id,
        &CreateAlertParams {
            address_id: addr.id,
            alert_type: req.alert_type,
            threshold: req.threshold,
        },
    )
    .await?;

    Ok(Json(alert))
}

/// GET /api/alerts — All alert rules owned by the authenticated user.
async fn list_alerts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Alert>>, AppError> {
    let alerts = AlertService::list_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(alerts))
}

/// DELETE /api/alerts/:id — Remove one of the user's alert rules.
async fn delete_alert(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    if AlertService::delete(&state.pool, alert_id, auth.user_id).await? {
        Ok(Json(json!({ "deleted": true })))
    } else {
        Err(AppError::NotFound(format!("Alert {} not found", alert_id)))
    }
}
