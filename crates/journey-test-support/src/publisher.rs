//! Action publisher doubles.

use std::sync::Mutex;

use async_trait::async_trait;
use journey_card_application::application::ports::{ActionPublisher, PublishOutcome};
use journey_card_application::domain::action::Action;
use journey_core::error::DomainError;

/// A publisher that records every action and reports each `action_id` as
/// published the first time and duplicate afterwards.
#[derive(Debug, Default)]
pub struct RecordingActionPublisher {
    published: Mutex<Vec<Action>>,
}

impl RecordingActionPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the distinct actions published, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published(&self) -> Vec<Action> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionPublisher for RecordingActionPublisher {
    async fn publish(&self, action: &Action) -> Result<PublishOutcome, DomainError> {
        let mut published = self.published.lock().unwrap();
        if published.iter().any(|a| a.action_id == action.action_id) {
            return Ok(PublishOutcome::Duplicate);
        }
        published.push(action.clone());
        Ok(PublishOutcome::Published)
    }
}

/// A publisher that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingActionPublisher;

#[async_trait]
impl ActionPublisher for FailingActionPublisher {
    async fn publish(&self, _action: &Action) -> Result<PublishOutcome, DomainError> {
        Err(DomainError::Infrastructure("broker unavailable".into()))
    }
}
