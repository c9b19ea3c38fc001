//! Address routes: tracking, detail view and the balance poll endpoint.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ethwatch_common::address;
use ethwatch_common::error::AppError;
use ethwatch_common::types::{EthereumAddress, Transaction};
use ethwatch_sync::service::SyncService;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/addresses", post(add_address))
        .route("/api/addresses/{address}", get(address_detail))
        .route("/api/addresses/{address}/balance", get(address_balance))
}

/// How many transactions the detail view returns.
const DETAIL_TX_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct AddAddressRequest {
    pub address: String,
    pub label: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddressDetail {
    pub address: EthereumAddress,
    pub transactions: Vec<Transaction>,
    pub outgoing_count: i64,
    pub incoming_count: i64,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: Decimal,
    pub last_updated: Option<DateTime<Utc>>,
}

/// POST /api/addresses — Track a new address for the authenticated user.
///
/// Validates and normalizes the address, links it into the user's "Default"
/// watchlist (created idempotently, keyed on (user, name)) and performs an
/// initial balance refresh. A provider failure during that refresh is
/// logged, not fatal — the address is tracked either way.
async fn add_address(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<AddAddressRequest>,
) -> Result<Json<EthereumAddress>, AppError> {
    let mut addr = SyncService::get_or_create_address(&state.pool, &req.address).await?;

    if let Some(label) = req.label.as_deref().map(str::trim)
        && !label.is_empty()
    {
        addr = sqlx::query_as(
            "UPDATE ethereum_addresses SET label = $1 WHERE id = $2 RETURNING *",
        )
        .bind(label)
        .bind(addr.id)
        .fetch_one(&state.pool)
        .await?;
    }

    let watchlist_id = default_watchlist(&state, auth.user_id).await?;

    sqlx::query(
        r#"
        INSERT INTO watchlist_entries (id, watchlist_id, address_id, notes)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (watchlist_id, address_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(watchlist_id)
    .bind(addr.id)
    .bind(req.notes.unwrap_or_default())
    .execute(&state.pool)
    .await?;

    tracing::info!(
        user_id = %auth.user_id,
        address = %addr.address,
        "Address added to default watchlist"
    );

    match SyncService::refresh_balance(&state.pool, &state.etherscan, &state.notifier, &addr).await
    {
        Ok(refreshed) => addr = refreshed,
        Err(e) => {
            tracing::warn!(address = %addr.address, error = %e, "Initial balance refresh failed")
        }
    }

    Ok(Json(addr))
}

/// GET /api/addresses/:address — Detail view with merged transaction
/// history, newest first.
///
/// When no transactions are known locally the history is seeded from the
/// explorer before rendering; a provider failure there propagates to the
/// caller.
async fn address_detail(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<AddressDetail>, AppError> {
    let canonical = address::normalize(&raw)?;
    let addr = SyncService::find_by_address(&state.pool, &canonical)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Address {} is not tracked", canonical)))?;

    // Lazy history seeding, gated only on "zero known transactions".
    if SyncService::transaction_count(&state.pool, addr.id).await? == 0 {
        SyncService::sync_transactions(&state.pool, &state.etherscan, &state.notifier, &addr)
            .await?;
    }

    let mut transactions: Vec<Transaction> = sqlx::query_as(
        r#"
        (SELECT * FROM transactions WHERE from_address_id = $1
         ORDER BY block_timestamp DESC LIMIT $2)
        UNION ALL
        (SELECT * FROM transactions WHERE to_address_id = $1
         ORDER BY block_timestamp DESC LIMIT $2)
        "#,
    )
    .bind(addr.id)
    .bind(DETAIL_TX_LIMIT)
    .fetch_all(&state.pool)
    .await?;

    transactions.sort_by(|a, b| {
        b.block_timestamp
            .cmp(&a.block_timestamp)
            .then(b.id.cmp(&a.id))
    });
    transactions.dedup_by_key(|t| t.id);
    transactions.truncate(DETAIL_TX_LIMIT as usize);

    let (outgoing_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE from_address_id = $1")
            .bind(addr.id)
            .fetch_one(&state.pool)
            .await?;
    let (incoming_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE to_address_id = $1")
            .bind(addr.id)
            .fetch_one(&state.pool)
            .await?;

    Ok(Json(AddressDetail {
        address: addr,
        transactions,
        outgoing_count,
        incoming_count,
    }))
}

/// GET /api/addresses/:address/balance — Refresh and return the current
/// balance. The JSON polling endpoint; provider failures are serialized as
/// a 502 error response.
async fn address_balance(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<BalanceResponse>, AppError> {
    let canonical = address::normalize(&raw)?;
    let addr = SyncService::find_by_address(&state.pool, &canonical)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Address {} is not tracked", canonical)))?;

    let refreshed =
        SyncService::refresh_balance(&state.pool, &state.etherscan, &state.notifier, &addr).await?;

    Ok(Json(BalanceResponse {
        address: refreshed.address,
        balance: refreshed.balance,
        last_updated: refreshed.last_synced_at,
    }))
}

/// Idempotent get-or-create of the user's "Default" watchlist, keyed on
/// (user_id, name).
async fn default_watchlist(state: &AppState, user_id: Uuid) -> Result<Uuid, AppError> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO watchlists (id, user_id, name, description)
        VALUES ($1, $2, 'Default', 'Default watchlist')
        ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(id)
}
