//! On-demand balance and transaction synchronization against an
//! Etherscan-compatible explorer API.
//!
//! Sync is synchronous and request-driven: a page or API request triggers a
//! refresh, the refresh updates the store, and meaningful changes are handed
//! to the notification dispatcher. There is no background polling, retry or
//! caching — the domain accepts best-effort freshness.

pub mod etherscan;
pub mod service;
pub mod units;
