//! Redis adapters for the customer journey orchestrator.
//!
//! Both adapters share one `ConnectionManager`, which multiplexes commands
//! over a single connection and reconnects on its own.

pub mod coordination;
pub mod state_store;

use journey_core::error::DomainError;
use tracing::debug;

/// Opens a managed connection to the Redis server at `url`.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the URL is invalid or the
/// server cannot be reached.
pub async fn connect(url: &str) -> Result<redis::aio::ConnectionManager, DomainError> {
    let client = redis::Client::open(url).map_err(|e| {
        DomainError::Infrastructure(format!("failed to create Redis client: {e}"))
    })?;
    let manager = redis::aio::ConnectionManager::new(client)
        .await
        .map_err(|e| DomainError::Infrastructure(format!("failed to connect to Redis: {e}")))?;
    debug!("redis connection established");
    Ok(manager)
}

pub(crate) fn redis_error(command: &'static str) -> impl FnOnce(redis::RedisError) -> DomainError {
    move |e| DomainError::Infrastructure(format!("Redis {command} failed: {e}"))
}

/// Seconds for a Redis expiry; Redis rejects zero.
pub(crate) fn ttl_seconds(ttl: std::time::Duration) -> u64 {
    ttl.as_secs().max(1)
}
