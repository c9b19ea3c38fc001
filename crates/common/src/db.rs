use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Acquire timeout — sync handlers hold connections across explorer
/// round trips, so waiting longer than this means the pool is saturated.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the PostgreSQL pool shared by the API, sync and dispatch layers.
///
/// `max_connections` comes from `AppConfig::db_max_connections`.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, "PostgreSQL pool ready");
    Ok(pool)
}
