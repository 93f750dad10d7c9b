//! Query handlers for the Card Application context.
//!
//! Read-only views over the audit stores and the journey state store.

use chrono::{DateTime, Utc};
use journey_core::error::DomainError;
use serde::Serialize;
use tracing::instrument;

use super::ports::{ActionAuditSink, EventStore, EventTypeCount, StateStore};
use crate::domain::action::Action;
use crate::domain::events::CustomerEvent;
use crate::domain::state::{JourneyState, JourneyStep};

/// Upper bound for any caller-supplied list limit.
pub const MAX_LIST_LIMIT: u32 = 100;

/// Aggregate view served by the dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_events: u64,
    pub total_actions: u64,
    pub events_by_type: Vec<EventTypeCount>,
    pub recent_actions: Vec<Action>,
}

/// Read-only view of a customer's journey.
#[derive(Debug, Serialize)]
pub struct JourneyView {
    pub customer_id: String,
    pub current_step: JourneyStep,
    pub document_count: u32,
    pub remaining_documents: u32,
    pub is_complete: bool,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&JourneyState> for JourneyView {
    fn from(state: &JourneyState) -> Self {
        Self {
            customer_id: state.customer_id().to_owned(),
            current_step: state.current_step(),
            document_count: state.document_count(),
            remaining_documents: state.remaining_documents(),
            is_complete: state.is_complete(),
            started_at: state.started_at(),
            updated_at: state.updated_at(),
        }
    }
}

/// Clamps a requested list limit into `1..=MAX_LIST_LIMIT`, falling back
/// to `default_limit` when none was given.
#[must_use]
pub fn clamp_limit(requested: Option<u32>, default_limit: u32) -> u32 {
    requested
        .unwrap_or(default_limit)
        .clamp(1, MAX_LIST_LIMIT)
}

/// Collects the dashboard statistics.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if either audit store fails.
#[instrument(skip(events, actions))]
pub async fn get_dashboard_stats(
    events: &dyn EventStore,
    actions: &dyn ActionAuditSink,
    recent_limit: u32,
) -> Result<DashboardStats, DomainError> {
    Ok(DashboardStats {
        total_events: events.count_all().await?,
        total_actions: actions.count_all().await?,
        events_by_type: events.count_by_type().await?,
        recent_actions: actions.recent(recent_limit.clamp(1, MAX_LIST_LIMIT)).await?,
    })
}

/// Audited events of one customer, newest first.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a blank customer id and
/// `DomainError::Infrastructure` if the event store fails.
#[instrument(skip(events))]
pub async fn get_customer_history(
    customer_id: &str,
    limit: u32,
    events: &dyn EventStore,
) -> Result<Vec<CustomerEvent>, DomainError> {
    if customer_id.trim().is_empty() {
        return Err(DomainError::Validation(
            "customer_id cannot be blank".to_owned(),
        ));
    }
    events
        .find_by_customer(customer_id, limit.clamp(1, MAX_LIST_LIMIT))
        .await
}

/// Current journey of a customer, `None` when no journey is active.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the state store fails.
#[instrument(skip(states))]
pub async fn get_journey(
    customer_id: &str,
    states: &dyn StateStore,
) -> Result<Option<JourneyView>, DomainError> {
    let state = states.get(customer_id).await?;
    Ok(state.as_ref().map(JourneyView::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit_uses_default_when_absent() {
        assert_eq!(clamp_limit(None, 10), 10);
    }

    #[test]
    fn test_clamp_limit_bounds_requested_value() {
        assert_eq!(clamp_limit(Some(0), 10), 1);
        assert_eq!(clamp_limit(Some(500), 10), MAX_LIST_LIMIT);
        assert_eq!(clamp_limit(Some(25), 10), 25);
    }
}
