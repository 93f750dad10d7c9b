//! Coordination store abstraction.
//!
//! A shared key-value primitive with per-key expiry. The only operation that
//! is safe to use as a cross-process lock is [`CoordinationStore::claim`],
//! which must be a single atomic "set if absent" on the backing store.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DomainError;

/// Distributed key-value store used to coordinate work across processes.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Atomically sets `key` to `value` with the given time-to-live, only if
    /// the key is absent. Returns `true` when this caller now owns the key.
    async fn claim(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError>;

    /// Reads the current value of `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Unconditionally sets `key` to `value` with the given time-to-live.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), DomainError>;
}
