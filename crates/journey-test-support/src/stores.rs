//! Store doubles for the Card Application ports.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use journey_card_application::application::ports::{
    ActionAuditSink, EventStore, EventTypeCount, StateStore,
};
use journey_card_application::domain::action::Action;
use journey_card_application::domain::events::CustomerEvent;
use journey_card_application::domain::state::JourneyState;
use journey_core::error::DomainError;

fn unreachable_store(name: &str) -> DomainError {
    DomainError::Infrastructure(format!("{name} unreachable"))
}

/// In-memory event audit. Duplicate event ids are ignored.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Mutex<Vec<CustomerEvent>>,
    offline: AtomicBool,
}

impl InMemoryEventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (`true`) or succeed (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of the audited events, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<CustomerEvent> {
        self.events.lock().unwrap().clone()
    }

    fn check_online(&self) -> Result<(), DomainError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(unreachable_store("event store"));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn save(&self, event: &CustomerEvent) -> Result<bool, DomainError> {
        self.check_online()?;
        let mut events = self.events.lock().unwrap();
        if events.iter().any(|e| e.event_id() == event.event_id()) {
            return Ok(false);
        }
        events.push(event.clone());
        Ok(true)
    }

    async fn find_by_customer(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        self.check_online()?;
        let mut matching: Vec<CustomerEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| e.customer_id() == customer_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn count_all(&self) -> Result<u64, DomainError> {
        self.check_online()?;
        Ok(self.events.lock().unwrap().len() as u64)
    }

    async fn count_by_type(&self) -> Result<Vec<EventTypeCount>, DomainError> {
        self.check_online()?;
        let mut counts: BTreeMap<&'static str, u64> = BTreeMap::new();
        for event in self.events.lock().unwrap().iter() {
            *counts.entry(event.event_type().as_str()).or_default() += 1;
        }
        let mut counts: Vec<EventTypeCount> = counts
            .into_iter()
            .map(|(event_type, count)| EventTypeCount {
                event_type: event_type.to_owned(),
                count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(counts)
    }
}

/// In-memory journey state store.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: Mutex<HashMap<String, JourneyState>>,
    offline: AtomicBool,
}

impl InMemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (`true`) or succeed (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Seeds the state of a customer.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert(&self, state: JourneyState) {
        self.states
            .lock()
            .unwrap()
            .insert(state.customer_id().to_owned(), state);
    }

    /// Stored state of `customer_id`, bypassing the offline switch.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn state_of(&self, customer_id: &str) -> Option<JourneyState> {
        self.states.lock().unwrap().get(customer_id).cloned()
    }

    fn check_online(&self) -> Result<(), DomainError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(unreachable_store("state store"));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, customer_id: &str) -> Result<Option<JourneyState>, DomainError> {
        self.check_online()?;
        Ok(self.state_of(customer_id))
    }

    async fn save(&self, state: &JourneyState) -> Result<(), DomainError> {
        self.check_online()?;
        self.insert(state.clone());
        Ok(())
    }

    async fn delete(&self, customer_id: &str) -> Result<(), DomainError> {
        self.check_online()?;
        self.states.lock().unwrap().remove(customer_id);
        Ok(())
    }
}

/// In-memory action audit. Duplicate action ids are ignored.
#[derive(Debug, Default)]
pub struct InMemoryActionAuditSink {
    actions: Mutex<Vec<Action>>,
    offline: AtomicBool,
}

impl InMemoryActionAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (`true`) or succeed (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of the audited actions, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    fn check_online(&self) -> Result<(), DomainError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(unreachable_store("action audit"));
        }
        Ok(())
    }
}

#[async_trait]
impl ActionAuditSink for InMemoryActionAuditSink {
    async fn record(&self, action: &Action) -> Result<bool, DomainError> {
        self.check_online()?;
        let mut actions = self.actions.lock().unwrap();
        if actions.iter().any(|a| a.action_id == action.action_id) {
            return Ok(false);
        }
        actions.push(action.clone());
        Ok(true)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Action>, DomainError> {
        self.check_online()?;
        let mut actions = self.actions();
        actions.reverse();
        actions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        actions.truncate(limit as usize);
        Ok(actions)
    }

    async fn count_all(&self) -> Result<u64, DomainError> {
        self.check_online()?;
        Ok(self.actions.lock().unwrap().len() as u64)
    }
}

/// An event store that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn save(&self, _event: &CustomerEvent) -> Result<bool, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn find_by_customer(
        &self,
        _customer_id: &str,
        _limit: u32,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn count_all(&self) -> Result<u64, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn count_by_type(&self) -> Result<Vec<EventTypeCount>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// A state store that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingStateStore;

#[async_trait]
impl StateStore for FailingStateStore {
    async fn get(&self, _customer_id: &str) -> Result<Option<JourneyState>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save(&self, _state: &JourneyState) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete(&self, _customer_id: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
