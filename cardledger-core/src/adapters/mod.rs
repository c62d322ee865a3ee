//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Repository port
//! - OS CSPRNG for SecureRandom
//! - HTTP mail gateway (and a no-op) for Notifier

pub mod duckdb;
pub mod notifier;
pub mod random;
