//! Authenticated dashboard: watchlists with their addresses, active alerts
//! and aggregate stats.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;

use ethwatch_common::error::AppError;
use ethwatch_common::types::{Alert, EthereumAddress, WatchList};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(dashboard))
}

#[derive(Debug, Serialize)]
pub struct WatchlistWithAddresses {
    #[serde(flatten)]
    pub watchlist: WatchList,
    pub addresses: Vec<EthereumAddress>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub watchlists: Vec<WatchlistWithAddresses>,
    pub active_alerts: Vec<Alert>,
    pub tracked_address_count: i64,
    pub total_balance: Decimal,
}

/// GET /api/dashboard — Everything the authenticated user's overview page
/// needs in one round trip per section.
async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let lists: Vec<WatchList> =
        sqlx::query_as("SELECT * FROM watchlists WHERE user_id = $1 ORDER BY created_at")
            .bind(auth.user_id)
            .fetch_all(&state.pool)
            .await?;

    let mut watchlists = Vec::with_capacity(lists.len());
    for watchlist in lists {
        let addresses: Vec<EthereumAddress> = sqlx::query_as(
            r#"
            SELECT a.*
            FROM ethereum_addresses a
            JOIN watchlist_entries we ON we.address_id = a.id
            WHERE we.watchlist_id = $1
            ORDER BY we.added_at DESC
            "#,
        )
        .bind(watchlist.id)
        .fetch_all(&state.pool)
        .await?;

        watchlists.push(WatchlistWithAddresses {
            watchlist,
            addresses,
        });
    }

    let active_alerts: Vec<Alert> = sqlx::query_as(
        "SELECT * FROM alerts WHERE user_id = $1 AND active = true ORDER BY created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&state.pool)
    .await?;

    let (tracked_address_count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(DISTINCT we.address_id)
        FROM watchlist_entries we
        JOIN watchlists w ON w.id = we.watchlist_id
        WHERE w.user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_one(&state.pool)
    .await?;

    // Sum over distinct addresses so one address in two lists counts once.
    let (total_balance,): (Decimal,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(balance), 0)
        FROM ethereum_addresses
        WHERE id IN (
            SELECT DISTINCT we.address_id
            FROM watchlist_entries we
            JOIN watchlists w ON w.id = we.watchlist_id
            WHERE w.user_id = $1
        )
        "#,
    )
    .bind(auth.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(DashboardResponse {
        watchlists,
        active_alerts,
        tracked_address_count,
        total_balance,
    }))
}
