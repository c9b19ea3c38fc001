//! Public home feed: recent activity and top tracked addresses.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ethwatch_common::error::AppError;
use ethwatch_common::types::EthereumAddress;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/home", get(home))
}

/// A transaction joined with its endpoint addresses for display.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecentTransaction {
    pub hash: String,
    pub value: Decimal,
    pub block_number: i64,
    pub block_timestamp: DateTime<Utc>,
    pub status: bool,
    pub from_address: String,
    pub to_address: String,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub recent_transactions: Vec<RecentTransaction>,
    pub top_addresses: Vec<EthereumAddress>,
}

/// GET /api/home — 10 most recent transactions and top 5 addresses by
/// balance.
async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>, AppError> {
    let recent_transactions: Vec<RecentTransaction> = sqlx::query_as(
        r#"
        SELECT t.hash, t.value, t.block_number, t.block_timestamp, t.status,
               f.address AS from_address, x.address AS to_address
        FROM transactions t
        JOIN ethereum_addresses f ON f.id = t.from_address_id
        JOIN ethereum_addresses x ON x.id = t.to_address_id
        ORDER BY t.block_timestamp DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let top_addresses: Vec<EthereumAddress> =
        sqlx::query_as("SELECT * FROM ethereum_addresses ORDER BY balance DESC LIMIT 5")
            .fetch_all(&state.pool)
            .await?;

    Ok(Json(HomeResponse {
        recent_transactions,
        top_addresses,
    }))
}
