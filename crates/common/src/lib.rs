//! Shared foundation for the EthWatch workspace: configuration, database
//! pool construction, the common error type and the domain model.

pub mod address;
pub mod config;
pub mod db;
pub mod error;
pub mod types;
