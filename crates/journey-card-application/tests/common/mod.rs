//! Shared harness for Card Application integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use journey_card_application::application::action_publisher::{
    IdempotentActionPublisher, PublisherSettings,
};
use journey_card_application::application::decision_engine::DecisionEngine;
use journey_card_application::application::orchestrator::Orchestrator;
use journey_card_application::domain::events::{CustomerEvent, EventType};
use journey_card_application::domain::messages::{Locale, MessageCatalog};
use journey_card_application::domain::state::DocumentRequirement;
use journey_test_support::{
    FixedClock, InMemoryActionAuditSink, InMemoryCoordinationStore, InMemoryEventStore,
    InMemoryStateStore, RecordingProducer,
};

pub const ACTIONS_TOPIC: &str = "actions";

/// Fixed timestamp used across the tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

pub fn event(id: &str, customer_id: &str, event_type: EventType) -> CustomerEvent {
    CustomerEvent::new(id, customer_id, event_type, t0(), BTreeMap::new()).unwrap()
}

pub fn event_with_segment(
    id: &str,
    customer_id: &str,
    event_type: EventType,
    segment: &str,
) -> CustomerEvent {
    let metadata = BTreeMap::from([("segment".to_owned(), segment.to_owned())]);
    CustomerEvent::new(id, customer_id, event_type, t0(), metadata).unwrap()
}

pub fn publisher_settings() -> PublisherSettings {
    PublisherSettings {
        topic: ACTIONS_TOPIC.to_owned(),
        ack_timeout: Duration::from_millis(200),
        ..PublisherSettings::default()
    }
}

/// An orchestrator wired to in-memory doubles and the real publisher.
pub struct Harness {
    pub events: Arc<InMemoryEventStore>,
    pub states: Arc<InMemoryStateStore>,
    pub coordination: Arc<InMemoryCoordinationStore>,
    pub producer: Arc<RecordingProducer>,
    pub audit: Arc<InMemoryActionAuditSink>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_producer(RecordingProducer::new())
    }

    pub fn with_producer(producer: RecordingProducer) -> Self {
        let events = Arc::new(InMemoryEventStore::new());
        let states = Arc::new(InMemoryStateStore::new());
        let coordination = Arc::new(InMemoryCoordinationStore::new());
        let producer = Arc::new(producer);
        let audit = Arc::new(InMemoryActionAuditSink::new());
        let publisher = Arc::new(IdempotentActionPublisher::new(
            coordination.clone(),
            producer.clone(),
            audit.clone(),
            publisher_settings(),
        ));
        let orchestrator = Orchestrator::new(
            events.clone(),
            states.clone(),
            DecisionEngine::new(
                DocumentRequirement::default(),
                MessageCatalog::new(Locale::Tr),
            ),
            publisher,
            Arc::new(FixedClock(t0())),
        );
        Self {
            events,
            states,
            coordination,
            producer,
            audit,
            orchestrator,
        }
    }

    /// Messages acknowledged on the actions topic, deserialized.
    pub fn sent_actions(&self) -> Vec<serde_json::Value> {
        self.producer
            .sent_to(ACTIONS_TOPIC)
            .iter()
            .map(|m| serde_json::from_str(&m.payload).unwrap())
            .collect()
    }
}
