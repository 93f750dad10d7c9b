//! Outbound customer actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::JourneyStep;

/// Action type for mobile push notifications.
pub const PUSH_NOTIFICATION_ACTION_TYPE: &str = "PUSH_NOTIFICATION";

/// Delivery channel for the mobile app.
pub const MOBILE_APP_CHANNEL: &str = "MOBILE_APP";

/// Campaign every card application notification belongs to.
pub const CARD_ONBOARDING_CAMPAIGN: &str = "campaign-card-onboarding";

/// Namespace for deriving action ids from the transition that caused them.
const ACTION_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_3c2e_9b4d_4e71_a8c5_2f0d_7e93_b164);

/// A customer notification, published at most once per `action_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Idempotency key.
    pub action_id: Uuid,
    pub customer_id: String,
    pub action_type: String,
    pub message: String,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Action {
    /// Derives the action id for the notification caused by `event_id`
    /// moving `customer_id` into `step`. The same transition always yields
    /// the same id.
    #[must_use]
    pub fn derive_id(customer_id: &str, event_id: &str, step: JourneyStep) -> Uuid {
        let name = format!("{customer_id}:{event_id}:{step}");
        Uuid::new_v5(&ACTION_ID_NAMESPACE, name.as_bytes())
    }
}
