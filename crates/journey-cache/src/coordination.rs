//! Redis implementation of the coordination store.

use std::time::Duration;

use async_trait::async_trait;
use journey_core::coordination::CoordinationStore;
use journey_core::error::DomainError;
use redis::aio::ConnectionManager;

use crate::{redis_error, ttl_seconds};

/// Redis-backed [`CoordinationStore`]. `claim` maps to `SET NX EX`, which
/// Redis executes atomically.
#[derive(Clone)]
pub struct RedisCoordinationStore {
    connection_manager: ConnectionManager,
}

impl std::fmt::Debug for RedisCoordinationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCoordinationStore")
            .field("connection_manager", &"ConnectionManager")
            .finish()
    }
}

impl RedisCoordinationStore {
    #[must_use]
    pub fn new(connection_manager: ConnectionManager) -> Self {
        Self { connection_manager }
    }
}

#[async_trait]
impl CoordinationStore for RedisCoordinationStore {
    async fn claim(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        let mut conn = self.connection_manager.clone();
        // Nil reply when the key already exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async(&mut conn)
            .await
            .map_err(redis_error("SET NX"))?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(redis_error("GET"))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_seconds(ttl))
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(redis_error("SETEX"))
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(redis_error("DEL"))
    }
}
