//! Customer lifecycle events consumed by the Card Application context.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use journey_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Wire name for [`EventType::CardApply`].
pub const CARD_APPLY_EVENT_TYPE: &str = "CARD_APPLY";

/// Wire name for [`EventType::DocumentUpload`].
pub const DOCUMENT_UPLOAD_EVENT_TYPE: &str = "DOCUMENT_UPLOAD";

/// Wire name for [`EventType::Approval`].
pub const APPROVAL_EVENT_TYPE: &str = "APPROVAL";

/// Wire name for [`EventType::Rejection`].
pub const REJECTION_EVENT_TYPE: &str = "REJECTION";

/// The closed set of customer event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// The customer submitted a card application.
    #[serde(alias = "application-submitted")]
    CardApply,
    /// The customer uploaded a supporting document.
    #[serde(alias = "document-uploaded")]
    DocumentUpload,
    /// The application was approved.
    #[serde(alias = "approved")]
    Approval,
    /// The application was rejected.
    #[serde(alias = "rejected")]
    Rejection,
}

impl EventType {
    /// All event types, in journey order.
    pub const ALL: [Self; 4] = [
        Self::CardApply,
        Self::DocumentUpload,
        Self::Approval,
        Self::Rejection,
    ];

    /// Canonical wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CardApply => CARD_APPLY_EVENT_TYPE,
            Self::DocumentUpload => DOCUMENT_UPLOAD_EVENT_TYPE,
            Self::Approval => APPROVAL_EVENT_TYPE,
            Self::Rejection => REJECTION_EVENT_TYPE,
        }
    }

    /// Whether the customer should hear back as soon as this event lands.
    #[must_use]
    pub fn requires_immediate_action(self) -> bool {
        matches!(self, Self::CardApply | Self::Approval | Self::Rejection)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CARD_APPLY_EVENT_TYPE | "application-submitted" => Ok(Self::CardApply),
            DOCUMENT_UPLOAD_EVENT_TYPE | "document-uploaded" => Ok(Self::DocumentUpload),
            APPROVAL_EVENT_TYPE | "approved" => Ok(Self::Approval),
            REJECTION_EVENT_TYPE | "rejected" => Ok(Self::Rejection),
            other => Err(DomainError::Validation(format!(
                "unrecognized event type: {other}"
            ))),
        }
    }
}

/// An immutable fact about a customer, created once at the stream boundary.
/// Only [`CustomerEvent::new`] builds one, so ids are never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerEvent {
    event_id: String,
    customer_id: String,
    event_type: EventType,
    timestamp: DateTime<Utc>,
    metadata: BTreeMap<String, String>,
}

impl CustomerEvent {
    /// Creates a new event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `event_id` or `customer_id` is
    /// blank.
    pub fn new(
        event_id: impl Into<String>,
        customer_id: impl Into<String>,
        event_type: EventType,
        timestamp: DateTime<Utc>,
        metadata: BTreeMap<String, String>,
    ) -> Result<Self, DomainError> {
        let event_id = event_id.into();
        let customer_id = customer_id.into();
        if event_id.trim().is_empty() {
            return Err(DomainError::Validation(
                "event_id cannot be blank".to_owned(),
            ));
        }
        if customer_id.trim().is_empty() {
            return Err(DomainError::Validation(
                "customer_id cannot be blank".to_owned(),
            ));
        }
        Ok(Self {
            event_id,
            customer_id,
            event_type,
            timestamp,
            metadata,
        })
    }

    /// Unique event identifier, used for stream deduplication.
    #[must_use]
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Customer the event belongs to; also the partition key.
    #[must_use]
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    /// Kind of event.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// When the event happened.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Free-form string attributes such as `segment`.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    #[must_use]
    pub fn is_card_application(&self) -> bool {
        self.event_type == EventType::CardApply
    }

    #[must_use]
    pub fn is_document_upload(&self) -> bool {
        self.event_type == EventType::DocumentUpload
    }

    #[must_use]
    pub fn is_approval(&self) -> bool {
        self.event_type == EventType::Approval
    }

    #[must_use]
    pub fn is_rejection(&self) -> bool {
        self.event_type == EventType::Rejection
    }

    #[must_use]
    pub fn requires_immediate_action(&self) -> bool {
        self.event_type.requires_immediate_action()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_new_rejects_blank_event_id() {
        // Act
        let result = CustomerEvent::new(
            "  ",
            "C1",
            EventType::CardApply,
            fixed_now(),
            BTreeMap::new(),
        );

        // Assert
        match result.unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("event_id")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_blank_customer_id() {
        let result = CustomerEvent::new(
            "E1",
            "",
            EventType::CardApply,
            fixed_now(),
            BTreeMap::new(),
        );

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("customer_id")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_event_type_parses_canonical_names_and_aliases() {
        assert_eq!(
            "CARD_APPLY".parse::<EventType>().unwrap(),
            EventType::CardApply
        );
        assert_eq!(
            "document-uploaded".parse::<EventType>().unwrap(),
            EventType::DocumentUpload
        );
        assert_eq!(
            "approved".parse::<EventType>().unwrap(),
            EventType::Approval
        );
        assert_eq!(
            "REJECTION".parse::<EventType>().unwrap(),
            EventType::Rejection
        );
    }

    #[test]
    fn test_event_type_rejects_unknown_name() {
        let result = "CARD_CANCEL".parse::<EventType>();

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_only_card_apply_and_decisions_require_immediate_action() {
        let immediate: Vec<EventType> = EventType::ALL
            .into_iter()
            .filter(|t| t.requires_immediate_action())
            .collect();

        assert_eq!(
            immediate,
            vec![
                EventType::CardApply,
                EventType::Approval,
                EventType::Rejection
            ]
        );
    }

    #[test]
    fn test_event_queries_follow_event_type() {
        // Arrange
        let event = |event_type| {
            CustomerEvent::new("E1", "C1", event_type, fixed_now(), BTreeMap::new()).unwrap()
        };

        // Act
        let approval = event(EventType::Approval);
        let rejection = event(EventType::Rejection);
        let upload = event(EventType::DocumentUpload);

        // Assert
        assert!(approval.is_approval() && !approval.is_rejection());
        assert!(rejection.is_rejection() && !rejection.is_approval());
        assert!(upload.is_document_upload() && !upload.is_card_application());
        assert!(!upload.is_approval() && !upload.is_rejection());
        assert!(!upload.requires_immediate_action());
        assert!(event(EventType::CardApply).is_card_application());
    }

    #[test]
    fn test_event_serializes_with_canonical_type_name() {
        let event = CustomerEvent::new(
            "E1",
            "C1",
            EventType::Approval,
            fixed_now(),
            BTreeMap::new(),
        )
        .unwrap();

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event_id"], "E1");
        assert_eq!(json["event_type"], "APPROVAL");
    }

    #[test]
    fn test_event_type_serializes_to_canonical_name() {
        let json = serde_json::to_string(&EventType::DocumentUpload).unwrap();

        assert_eq!(json, "\"DOCUMENT_UPLOAD\"");
    }
}
