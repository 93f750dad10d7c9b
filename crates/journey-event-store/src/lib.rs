//! `PostgreSQL` audit stores for the customer journey orchestrator.
//!
//! Every consumed event and every published action is appended here.
//! Writes are idempotent on the natural id of the row.

pub mod pg_action_audit;
pub mod pg_event_store;
pub mod schema;

use journey_core::error::DomainError;

/// Maps a driver error to a retryable infrastructure error.
pub(crate) fn database_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::Infrastructure(format!("{context}: {e}"))
}

/// Converts a `COUNT(*)` result.
pub(crate) fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}
