//! Wire form of inbound customer events.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use journey_card_application::domain::events::{CustomerEvent, EventType};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// `{event_id, customer_id, event_type, timestamp, metadata}`. Unknown
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub event_id: String,
    pub customer_id: String,
    pub event_type: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl EventPayload {
    /// Wire form of `event`.
    #[must_use]
    pub fn from_event(event: &CustomerEvent) -> Self {
        Self {
            event_id: event.event_id().to_owned(),
            customer_id: event.customer_id().to_owned(),
            event_type: event.event_type().as_str().to_owned(),
            timestamp: event
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            metadata: (!event.metadata().is_empty()).then(|| event.metadata().clone()),
        }
    }

    /// Converts the payload into a domain event.
    ///
    /// # Errors
    ///
    /// `IngestError::UnknownEventType` and `IngestError::InvalidTimestamp`
    /// for undecodable fields, `IngestError::Domain` if the event itself is
    /// invalid.
    pub fn into_event(self) -> Result<CustomerEvent, IngestError> {
        let event_type: EventType = self
            .event_type
            .parse()
            .map_err(IngestError::UnknownEventType)?;
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|source| IngestError::InvalidTimestamp {
                value: self.timestamp.clone(),
                source,
            })?
            .with_timezone(&Utc);

        Ok(CustomerEvent::new(
            self.event_id,
            self.customer_id,
            event_type,
            timestamp,
            self.metadata.unwrap_or_default(),
        )?)
    }
}

/// Parses a raw record value into a domain event.
///
/// # Errors
///
/// See [`EventPayload::into_event`]; malformed JSON is
/// `IngestError::MalformedPayload`.
pub fn parse_event(raw: &str) -> Result<CustomerEvent, IngestError> {
    serde_json::from_str::<EventPayload>(raw)?.into_event()
}
