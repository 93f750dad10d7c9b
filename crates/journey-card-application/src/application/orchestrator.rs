//! Sense, analyze, act.
//!
//! The orchestrator is the single entry point for a validated event. It
//! audits the event, moves the customer's journey forward when the decision
//! engine allows it, persists the new state and hands the resulting
//! notification to the action publisher.

use std::sync::Arc;
use std::time::Instant;

use journey_core::clock::Clock;
use journey_core::error::DomainError;
use opentelemetry::KeyValue;
use opentelemetry::metrics::Counter;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::decision_engine::DecisionEngine;
use super::ports::{ActionPublisher, EventStore, PublishOutcome, StateStore};
use crate::domain::customer::{Customer, SEGMENT_METADATA_KEY, Segment};
use crate::domain::events::CustomerEvent;
use crate::domain::state::{JourneyState, JourneyStep};

/// Metric label for events that failed with a retryable error.
pub const RETRYABLE_FAILURE_LABEL: &str = "retryable_infrastructure_failure";

/// What became of the notification of a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Published,
    AlreadyPublished,
    /// Publishing failed; the state change stands regardless.
    Failed(String),
}

/// A journey transition applied by [`Orchestrator::process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransition {
    pub previous_step: Option<JourneyStep>,
    pub new_step: JourneyStep,
    pub action_id: Uuid,
    pub notification: NotificationStatus,
}

/// Result of processing one event that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Success(AppliedTransition),
    /// The event was already applied to the journey.
    SkippedDuplicate,
    /// The event does not apply in the journey's current step.
    SkippedInvalidTransition,
    /// The state machine refused the transition.
    SkippedBusinessRule,
}

impl ProcessingOutcome {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::SkippedDuplicate => "skipped_duplicate",
            Self::SkippedInvalidTransition => "skipped_invalid_transition",
            Self::SkippedBusinessRule => "skipped_business_rule",
        }
    }
}

/// Drives one customer event through the journey.
pub struct Orchestrator {
    event_store: Arc<dyn EventStore>,
    state_store: Arc<dyn StateStore>,
    engine: DecisionEngine,
    publisher: Arc<dyn ActionPublisher>,
    clock: Arc<dyn Clock>,
    processed: Counter<u64>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        event_store: Arc<dyn EventStore>,
        state_store: Arc<dyn StateStore>,
        engine: DecisionEngine,
        publisher: Arc<dyn ActionPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let processed = opentelemetry::global::meter("journey-card-application")
            .u64_counter("journey.events.processed")
            .with_description("Customer events processed by outcome")
            .build();
        Self {
            event_store,
            state_store,
            engine,
            publisher,
            clock,
            processed,
        }
    }

    /// Processes `event`.
    ///
    /// Skips are reported as outcomes; a failed publish is logged and
    /// reported inside the outcome.
    ///
    /// # Errors
    ///
    /// Returns the error of the event audit, the state load or the state
    /// save. Those leave the journey unchanged and the event safe to
    /// redeliver.
    #[instrument(
        skip(self, event),
        fields(
            event_id = %event.event_id(),
            customer_id = %event.customer_id(),
            event_type = %event.event_type()
        )
    )]
    pub async fn process(&self, event: &CustomerEvent) -> Result<ProcessingOutcome, DomainError> {
        let started = Instant::now();
        let result = self.run(event).await;

        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(e) if e.is_retryable() => RETRYABLE_FAILURE_LABEL,
            Err(_) => "failure",
        };
        self.processed.add(1, &[KeyValue::new("outcome", label)]);
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(_) => info!(outcome = label, latency_ms, "event processed"),
            Err(e) => warn!(outcome = label, latency_ms, error = %e, "event processing failed"),
        }
        result
    }

    async fn run(&self, event: &CustomerEvent) -> Result<ProcessingOutcome, DomainError> {
        if !self.event_store.save(event).await? {
            debug!("event already audited");
        }

        let current = self.state_store.get(event.customer_id()).await?;
        if let Some(state) = current.as_ref().filter(|s| s.has_applied(event.event_id())) {
            // A crash after the state save may have lost the notification of
            // the latest event; the publisher drops it if it already went out.
            if state.last_event_id() == Some(event.event_id()) {
                self.notify(state).await;
            }
            return Ok(ProcessingOutcome::SkippedDuplicate);
        }

        let Some(next_step) = self.engine.determine_next_step(current.as_ref(), event) else {
            info!(
                current_step = current.as_ref().map(|s| s.current_step().as_str()),
                "no transition for event"
            );
            return Ok(ProcessingOutcome::SkippedInvalidTransition);
        };

        let transitioned = match &current {
            None => JourneyState::start(
                event.customer_id(),
                event,
                self.engine.requirement(),
                self.clock.as_ref(),
            ),
            Some(state) => state.transition_to(next_step, event, self.clock.as_ref()),
        };
        let new_state = match transitioned {
            Ok(state) => state,
            Err(e @ DomainError::InvalidTransition { .. }) => {
                warn!(error = %e, "transition refused");
                return Ok(ProcessingOutcome::SkippedInvalidTransition);
            }
            Err(e) if e.is_business() => {
                warn!(error = %e, "transition refused");
                return Ok(ProcessingOutcome::SkippedBusinessRule);
            }
            Err(e) => return Err(e),
        };

        self.state_store.save(&new_state).await?;
        let previous_step = current.as_ref().map(JourneyState::current_step);
        info!(
            from = previous_step.map(JourneyStep::as_str),
            to = %new_state.current_step(),
            document_count = new_state.document_count(),
            "journey advanced"
        );

        let (action_id, notification) = self.notify(&new_state).await;
        Ok(ProcessingOutcome::Success(AppliedTransition {
            previous_step,
            new_step: new_state.current_step(),
            action_id,
            notification,
        }))
    }

    /// Publishes the notification for the step `state` is in. Failures are
    /// logged and returned as a status.
    async fn notify(&self, state: &JourneyState) -> (Uuid, NotificationStatus) {
        let customer = Customer::new(state.customer_id(), resolve_segment(state));
        let action = self.engine.generate_action(state, &customer);
        let status = match self.publisher.publish(&action).await {
            Ok(PublishOutcome::Published) => NotificationStatus::Published,
            Ok(PublishOutcome::Duplicate) => NotificationStatus::AlreadyPublished,
            Err(e) => {
                warn!(action_id = %action.action_id, error = %e, "notification not published");
                NotificationStatus::Failed(e.to_string())
            }
        };
        (action.action_id, status)
    }
}

/// Segment recorded in the journey metadata, `Regular` when absent or
/// unreadable.
fn resolve_segment(state: &JourneyState) -> Segment {
    match state.metadata().get(SEGMENT_METADATA_KEY) {
        None => Segment::default(),
        Some(raw) => raw.parse().unwrap_or_else(|e: DomainError| {
            warn!(segment = %raw, error = %e, "unreadable segment, using default");
            Segment::default()
        }),
    }
}
