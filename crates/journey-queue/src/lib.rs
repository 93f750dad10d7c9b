//! Postgres message queue adapter for the customer journey orchestrator.
//!
//! Every topic partition is its own pgmq queue, so the bus survives
//! restarts and committed records leave the queue.

pub mod pgmq_bus;

use journey_core::error::DomainError;

/// Maps a pgmq error to a retryable infrastructure error.
pub(crate) fn queue_error(
    operation: &'static str,
    queue: &str,
) -> impl FnOnce(pgmq::errors::PgmqError) -> DomainError {
    let queue = queue.to_owned();
    move |e| DomainError::Infrastructure(format!("pgmq {operation} on {queue} failed: {e}"))
}
