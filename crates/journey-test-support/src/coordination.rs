//! Coordination store doubles.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use journey_core::coordination::CoordinationStore;
use journey_core::error::DomainError;

/// In-memory coordination store. Keys never expire; the last TTL written
/// for each key is kept for assertions. Can be switched offline to
/// simulate an unreachable store.
#[derive(Debug, Default)]
pub struct InMemoryCoordinationStore {
    entries: Mutex<HashMap<String, (String, Duration)>>,
    offline: AtomicBool,
}

impl InMemoryCoordinationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (`true`) or succeed (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Seeds `key` as if another process had written it.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert(&self, key: &str, value: &str, ttl: Duration) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), (value.to_owned(), ttl));
    }

    /// Current value of `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn value_of(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(v, _)| v.clone())
    }

    /// TTL last written for `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    /// Number of live keys.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), DomainError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DomainError::Infrastructure("coordination store unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CoordinationStore for InMemoryCoordinationStore {
    async fn claim(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        self.check_online()?;
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_owned(), (value.to_owned(), ttl));
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        self.check_online()?;
        Ok(self.value_of(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        self.check_online()?;
        self.insert(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        self.check_online()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// A coordination store that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingCoordinationStore;

#[async_trait]
impl CoordinationStore for FailingCoordinationStore {
    async fn claim(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
