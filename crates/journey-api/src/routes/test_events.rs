//! Manual testing endpoints: event injection and journey lookup.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::SecondsFormat;
use journey_card_application::application::query_handlers::{self, JourneyView};
use journey_core::bus::OutboundMessage;
use journey_core::error::DomainError;
use journey_ingest::payload::EventPayload;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Status returned by the state lookup for a customer without a journey.
pub const NO_ACTIVE_JOURNEY: &str = "no_active_journey";

/// Query parameters of the injection endpoint.
#[derive(Debug, Deserialize)]
pub struct InjectParams {
    #[serde(default = "default_segment")]
    pub segment: String,
}

fn default_segment() -> String {
    "REGULAR".to_owned()
}

/// Response of a successful injection.
#[derive(Debug, Serialize)]
pub struct InjectResponse {
    pub status: &'static str,
    pub event_id: String,
    pub customer_id: String,
    pub event_type: String,
    pub timestamp: String,
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
}

/// Current journey of a customer, or a marker that there is none.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum JourneyLookup {
    Active(JourneyView),
    Inactive {
        customer_id: String,
        status: &'static str,
    },
}

/// POST /api/test/events/{customer_id}/{event_type}
///
/// Publishes a wire event onto the inbound topic. The event type is passed
/// through unchecked so that rejected events can be exercised end to end.
async fn inject_event(
    State(state): State<AppState>,
    Path((customer_id, event_type)): Path<(String, String)>,
    Query(params): Query<InjectParams>,
) -> Result<Json<InjectResponse>, ApiError> {
    if customer_id.trim().is_empty() {
        return Err(DomainError::Validation("customer_id cannot be blank".to_owned()).into());
    }

    let payload = EventPayload {
        event_id: Uuid::new_v4().to_string(),
        customer_id: customer_id.clone(),
        event_type: event_type.to_uppercase(),
        timestamp: state
            .clock
            .now()
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        metadata: Some(BTreeMap::from([
            ("segment".to_owned(), params.segment.to_uppercase()),
            ("channel".to_owned(), "rest_api".to_owned()),
        ])),
    };
    let body = serde_json::to_string(&payload)
        .map_err(|e| DomainError::Unknown(format!("failed to encode test event: {e}")))?;

    let topic = state.settings.customer_events_topic.clone();
    let receipt = state
        .producer
        .send(OutboundMessage::keyed(
            topic.clone(),
            customer_id.clone(),
            body,
        ))
        .await?;

    info!(
        event_id = %payload.event_id,
        customer_id = %customer_id,
        event_type = %payload.event_type,
        partition = receipt.partition,
        offset = receipt.offset,
        "test event published"
    );

    Ok(Json(InjectResponse {
        status: "published",
        event_id: payload.event_id,
        customer_id,
        event_type: payload.event_type,
        timestamp: payload.timestamp,
        topic,
        partition: receipt.partition,
        offset: receipt.offset,
    }))
}

/// GET /api/test/state/{customer_id}
async fn journey_state(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<JourneyLookup>, ApiError> {
    let lookup = match query_handlers::get_journey(&customer_id, state.state_store.as_ref()).await?
    {
        Some(view) => JourneyLookup::Active(view),
        None => JourneyLookup::Inactive {
            customer_id,
            status: NO_ACTIVE_JOURNEY,
        },
    };
    Ok(Json(lookup))
}

/// Returns the router for the testing endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/{customer_id}/{event_type}", post(inject_event))
        .route("/state/{customer_id}", get(journey_state))
}
