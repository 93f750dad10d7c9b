//! Decision engine for the card application journey.
//!
//! Pure and stateless: both operations depend only on their arguments and
//! the configuration captured at construction, so one engine can serve all
//! partitions concurrently.

use crate::domain::action::{
    Action, CARD_ONBOARDING_CAMPAIGN, MOBILE_APP_CHANNEL, PUSH_NOTIFICATION_ACTION_TYPE,
};
use crate::domain::customer::Customer;
use crate::domain::events::{CustomerEvent, EventType};
use crate::domain::messages::MessageCatalog;
use crate::domain::state::{DocumentRequirement, JourneyState, JourneyStep};

/// Decides journey transitions and renders the resulting notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine {
    requirement: DocumentRequirement,
    catalog: MessageCatalog,
}

impl DecisionEngine {
    #[must_use]
    pub fn new(requirement: DocumentRequirement, catalog: MessageCatalog) -> Self {
        Self {
            requirement,
            catalog,
        }
    }

    #[must_use]
    pub fn requirement(&self) -> DocumentRequirement {
        self.requirement
    }

    /// Returns the step `event` should move the journey to, or `None` when
    /// the event does not apply in the current state.
    #[must_use]
    pub fn determine_next_step(
        &self,
        current: Option<&JourneyState>,
        event: &CustomerEvent,
    ) -> Option<JourneyStep> {
        let Some(state) = current else {
            return event.is_card_application().then_some(JourneyStep::Applied);
        };

        match state.current_step() {
            JourneyStep::Applied => Some(JourneyStep::DocumentPending),
            JourneyStep::DocumentPending => self.after_document_pending(state, event),
            JourneyStep::UnderReview => match event.event_type() {
                EventType::Approval => Some(JourneyStep::Approved),
                EventType::Rejection => Some(JourneyStep::Rejected),
                EventType::CardApply | EventType::DocumentUpload => None,
            },
            JourneyStep::Approved | JourneyStep::Rejected => None,
        }
    }

    fn after_document_pending(
        &self,
        state: &JourneyState,
        event: &CustomerEvent,
    ) -> Option<JourneyStep> {
        if !event.is_document_upload() {
            return None;
        }
        if state.document_count() + 1 >= self.requirement.count() {
            Some(JourneyStep::UnderReview)
        } else {
            Some(JourneyStep::DocumentPending)
        }
    }

    /// Renders the notification for the step `state` is in.
    #[must_use]
    pub fn generate_action(&self, state: &JourneyState, customer: &Customer) -> Action {
        let step = state.current_step();
        let mut message = self
            .catalog
            .render(step, state.customer_id(), state.remaining_documents());
        if step == JourneyStep::Approved && customer.is_vip() {
            message.push_str(self.catalog.vip_addendum());
        }

        Action {
            action_id: Action::derive_id(
                state.customer_id(),
                state.last_event_id().unwrap_or_default(),
                step,
            ),
            customer_id: state.customer_id().to_owned(),
            action_type: PUSH_NOTIFICATION_ACTION_TYPE.to_owned(),
            message,
            channel: MOBILE_APP_CHANNEL.to_owned(),
            campaign_id: Some(CARD_ONBOARDING_CAMPAIGN.to_owned()),
            created_at: state.updated_at(),
        }
    }
}
