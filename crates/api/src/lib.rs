//! EthWatch JSON API: user accounts, tracked addresses, watchlists, alert
//! rules and notifications, backed by the sync and dispatch services.

pub mod middleware;
pub mod password;
pub mod routes;
pub mod state;
