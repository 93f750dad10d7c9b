//! Journey state for the Card Application context.
//!
//! A `JourneyState` is an immutable snapshot of where one customer stands in
//! the card application journey. It is created by [`JourneyState::start`],
//! restored from storage by [`JourneyState::rehydrate`], and superseded by
//! the new instance that [`JourneyState::transition_to`] returns.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use journey_core::clock::Clock;
use journey_core::error::DomainError;
use serde::{Deserialize, Serialize};

use super::events::CustomerEvent;

/// Steps of the card application journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JourneyStep {
    Applied,
    DocumentPending,
    UnderReview,
    Approved,
    Rejected,
}

impl JourneyStep {
    /// Canonical name, as persisted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "APPLIED",
            Self::DocumentPending => "DOCUMENT_PENDING",
            Self::UnderReview => "UNDER_REVIEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Terminal steps admit no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Steps reachable from this one in a single transition.
    #[must_use]
    pub fn successors(self) -> &'static [JourneyStep] {
        match self {
            Self::Applied => &[Self::DocumentPending],
            Self::DocumentPending => &[Self::DocumentPending, Self::UnderReview],
            Self::UnderReview => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: JourneyStep) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for JourneyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JourneyStep {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPLIED" => Ok(Self::Applied),
            "DOCUMENT_PENDING" => Ok(Self::DocumentPending),
            "UNDER_REVIEW" => Ok(Self::UnderReview),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(DomainError::Validation(format!("unknown journey step: {other}"))),
        }
    }
}

/// Number of documents a customer must upload before review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRequirement(u32);

impl DocumentRequirement {
    /// Creates a requirement; anything below one is raised to one.
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self(count.max(1))
    }

    #[must_use]
    pub fn count(self) -> u32 {
        self.0
    }
}

impl Default for DocumentRequirement {
    fn default() -> Self {
        Self(2)
    }
}

/// Persisted form of a [`JourneyState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneySnapshot {
    pub customer_id: String,
    pub current_step: JourneyStep,
    pub document_count: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub applied_event_ids: Vec<String>,
}

/// Immutable snapshot of one customer's position in the journey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JourneyState {
    customer_id: String,
    current_step: JourneyStep,
    document_count: u32,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    metadata: BTreeMap<String, String>,
    /// Ids of the events this journey has applied, oldest first. Bounded by
    /// the journey length.
    applied_event_ids: Vec<String>,
    requirement: DocumentRequirement,
}

impl JourneyState {
    /// Starts a journey from an application event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `customer_id` is blank or the
    /// event is not a card application.
    pub fn start(
        customer_id: &str,
        event: &CustomerEvent,
        requirement: DocumentRequirement,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        if customer_id.trim().is_empty() {
            return Err(DomainError::Validation(
                "customer_id cannot be blank".to_owned(),
            ));
        }
        if !event.is_card_application() {
            return Err(DomainError::Validation(format!(
                "journey can only start with a {} event, got: {}",
                super::events::CARD_APPLY_EVENT_TYPE,
                event.event_type()
            )));
        }
        let now = clock.now();
        Ok(Self {
            customer_id: customer_id.to_owned(),
            current_step: JourneyStep::Applied,
            document_count: 0,
            started_at: now,
            updated_at: now,
            metadata: event.metadata().clone(),
            applied_event_ids: vec![event.event_id().to_owned()],
            requirement,
        })
    }

    /// Restores a journey from storage. The triggering events are trusted
    /// and not re-validated; only the structural invariants are checked.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the snapshot has a blank customer
    /// id or more documents than the requirement allows.
    pub fn rehydrate(
        snapshot: JourneySnapshot,
        requirement: DocumentRequirement,
    ) -> Result<Self, DomainError> {
        if snapshot.customer_id.trim().is_empty() {
            return Err(DomainError::Validation(
                "customer_id cannot be blank".to_owned(),
            ));
        }
        if snapshot.document_count > requirement.count() {
            return Err(DomainError::Validation(format!(
                "document_count must be between 0 and {}, got: {}",
                requirement.count(),
                snapshot.document_count
            )));
        }
        Ok(Self {
            customer_id: snapshot.customer_id,
            current_step: snapshot.current_step,
            document_count: snapshot.document_count,
            started_at: snapshot.started_at,
            updated_at: snapshot.updated_at,
            metadata: snapshot.metadata,
            applied_event_ids: snapshot.applied_event_ids,
            requirement,
        })
    }

    /// Returns the state that results from moving to `new_step` because of
    /// `event`. The receiver is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if `new_step` is not a
    /// successor of the current step, and `DomainError::BusinessRule` if the
    /// move to `UnderReview` would happen with too few documents.
    pub fn transition_to(
        &self,
        new_step: JourneyStep,
        event: &CustomerEvent,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        if !self.current_step.can_transition_to(new_step) {
            return Err(DomainError::InvalidTransition {
                customer_id: self.customer_id.clone(),
                from: self.current_step.to_string(),
                to: new_step.to_string(),
            });
        }

        let required = self.requirement.count();
        let document_count = if event.is_document_upload() {
            (self.document_count + 1).min(required)
        } else {
            self.document_count
        };

        if new_step == JourneyStep::UnderReview && document_count < required {
            return Err(DomainError::BusinessRule(format!(
                "cannot move to {new_step}: only {document_count} of {required} documents \
                 uploaded for customer {}",
                self.customer_id
            )));
        }

        let mut applied_event_ids = self.applied_event_ids.clone();
        applied_event_ids.push(event.event_id().to_owned());

        Ok(Self {
            customer_id: self.customer_id.clone(),
            current_step: new_step,
            document_count,
            started_at: self.started_at,
            updated_at: clock.now(),
            metadata: self.metadata.clone(),
            applied_event_ids,
            requirement: self.requirement,
        })
    }

    /// Returns the persisted form of this state.
    #[must_use]
    pub fn snapshot(&self) -> JourneySnapshot {
        JourneySnapshot {
            customer_id: self.customer_id.clone(),
            current_step: self.current_step,
            document_count: self.document_count,
            started_at: self.started_at,
            updated_at: self.updated_at,
            metadata: self.metadata.clone(),
            applied_event_ids: self.applied_event_ids.clone(),
        }
    }

    #[must_use]
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    #[must_use]
    pub fn current_step(&self) -> JourneyStep {
        self.current_step
    }

    #[must_use]
    pub fn document_count(&self) -> u32 {
        self.document_count
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    #[must_use]
    pub fn requirement(&self) -> DocumentRequirement {
        self.requirement
    }

    /// Id of the event that produced this state.
    #[must_use]
    pub fn last_event_id(&self) -> Option<&str> {
        self.applied_event_ids.last().map(String::as_str)
    }

    /// Whether `event_id` has already been applied to this journey.
    #[must_use]
    pub fn has_applied(&self, event_id: &str) -> bool {
        self.applied_event_ids.iter().any(|id| id == event_id)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current_step.is_terminal()
    }

    #[must_use]
    pub fn needs_more_documents(&self) -> bool {
        self.current_step == JourneyStep::DocumentPending
            && self.document_count < self.requirement.count()
    }

    /// Documents still missing; zero outside `DocumentPending`.
    #[must_use]
    pub fn remaining_documents(&self) -> u32 {
        if self.current_step != JourneyStep::DocumentPending {
            return 0;
        }
        self.requirement.count().saturating_sub(self.document_count)
    }
}
