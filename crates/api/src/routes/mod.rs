pub mod addresses;
pub mod alerts;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod home;
pub mod notifications;
pub mod watchlists;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(home::router())
        .merge(addresses::router())
        .merge(watchlists::router())
        .merge(alerts::router())
        .merge(dashboard::router())
        .merge(notifications::router())
        .with_state(state)
}
