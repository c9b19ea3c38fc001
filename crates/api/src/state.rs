//! Shared application state for the Axum API server.

use sqlx::PgPool;

use ethwatch_common::config::AppConfig;
use ethwatch_notify::NotificationService;
use ethwatch_sync::etherscan::EtherscanClient;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub etherscan: EtherscanClient,
    pub notifier: NotificationService,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        etherscan: EtherscanClient,
        notifier: NotificationService,
    ) -> Self {
        Self {
            pool,
            config,
            etherscan,
            notifier,
        }
    }
}
