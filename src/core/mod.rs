//! In-memory authoritative log and index helpers.

/// Helper index aliases.
pub mod indices;
/// Authoritative operation log with sync-state tracking.
pub mod store;
