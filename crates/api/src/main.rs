//! EthWatch API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ethwatch_common::config::AppConfig;
use ethwatch_common::db::create_pool;
use ethwatch_notify::{Mailer, NoopMailer, NotificationService, ResendMailer};
use ethwatch_sync::etherscan::EtherscanClient;

use ethwatch_api::routes::create_router;
use ethwatch_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("ethwatch_api=debug,ethwatch_sync=debug,ethwatch_notify=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting EthWatch API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool and apply migrations
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database pool created, migrations applied");

    // Explorer client
    let etherscan = EtherscanClient::new(&config.etherscan_api_url, &config.etherscan_api_key);

    // Mail transport: Resend when configured, disabled otherwise
    let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(key)),
        None => {
            tracing::warn!("RESEND_API_KEY not set, email delivery disabled");
            Arc::new(NoopMailer)
        }
    };
    let notifier = NotificationService::new(mailer, config.email_from.clone());

    // Build application state
    let port = config.api_port;
    let state = AppState::new(pool, config, etherscan, notifier);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
