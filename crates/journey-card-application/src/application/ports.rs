//! Outbound ports of the Card Application context.
//!
//! Storage and delivery collaborators the orchestrator depends on. Their
//! implementations live in the adapter crates.

use async_trait::async_trait;
use journey_core::error::DomainError;
use serde::Serialize;

use crate::domain::action::Action;
use crate::domain::events::CustomerEvent;
use crate::domain::state::JourneyState;

/// Number of audited events of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTypeCount {
    pub event_type: String,
    pub count: u64,
}

/// Append-only audit trail of every consumed event.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Records `event`. A duplicate `event_id` is a silent no-op; the return
    /// value tells whether a new row was written.
    async fn save(&self, event: &CustomerEvent) -> Result<bool, DomainError>;

    /// Events of one customer, newest first.
    async fn find_by_customer(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> Result<Vec<CustomerEvent>, DomainError>;

    async fn count_all(&self) -> Result<u64, DomainError>;

    /// Event counts per type, largest first.
    async fn count_by_type(&self) -> Result<Vec<EventTypeCount>, DomainError>;
}

/// Current journey state per customer.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the state of `customer_id`; `None` means no active journey.
    async fn get(&self, customer_id: &str) -> Result<Option<JourneyState>, DomainError>;

    /// Replaces the stored state of the state's customer.
    async fn save(&self, state: &JourneyState) -> Result<(), DomainError>;

    async fn delete(&self, customer_id: &str) -> Result<(), DomainError>;
}

/// Relational audit of published actions.
#[async_trait]
pub trait ActionAuditSink: Send + Sync {
    /// Inserts `action` unless a row with the same `action_id` exists.
    /// Returns whether a new row was written.
    async fn record(&self, action: &Action) -> Result<bool, DomainError>;

    /// Most recent actions, newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<Action>, DomainError>;

    async fn count_all(&self) -> Result<u64, DomainError>;
}

/// Result of a successful publish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The action was sent and audited by this call.
    Published,
    /// The action had already been published; nothing was sent.
    Duplicate,
}

/// Delivers actions to customers at most once per `action_id`.
#[async_trait]
pub trait ActionPublisher: Send + Sync {
    /// Publishes `action`.
    ///
    /// # Errors
    ///
    /// `DomainError::Conflict` when another publish of the same action is in
    /// flight, `DomainError::Infrastructure` when the send or its audit
    /// failed. Both leave the action publishable by a later attempt.
    async fn publish(&self, action: &Action) -> Result<PublishOutcome, DomainError>;
}
