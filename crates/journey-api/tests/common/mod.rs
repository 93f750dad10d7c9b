//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use journey_api::routes;
use journey_api::state::{ApiSettings, AppState};
use journey_card_application::domain::events::{CustomerEvent, EventType};
use journey_core::clock::Clock;
use journey_test_support::{
    FixedClock, InMemoryActionAuditSink, InMemoryEventStore, InMemoryStateStore, LocalBus,
};
use tower::ServiceExt;

pub const EVENTS_TOPIC: &str = "customer-events";

/// Fixed timestamp used across all integration tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

pub fn event(id: &str, customer_id: &str, event_type: EventType) -> CustomerEvent {
    CustomerEvent::new(id, customer_id, event_type, t0(), BTreeMap::new()).unwrap()
}

/// In-memory collaborators behind a test router.
pub struct TestApp {
    pub events: Arc<InMemoryEventStore>,
    pub states: Arc<InMemoryStateStore>,
    pub audit: Arc<InMemoryActionAuditSink>,
    pub bus: Arc<LocalBus>,
    pub clock: Arc<dyn Clock>,
}

impl TestApp {
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(t0()));
        Self {
            events: Arc::new(InMemoryEventStore::new()),
            states: Arc::new(InMemoryStateStore::new()),
            audit: Arc::new(InMemoryActionAuditSink::new()),
            bus: Arc::new(LocalBus::new(4, Arc::clone(&clock))),
            clock,
        }
    }

    /// Builds the full app router. Uses the same route structure as `main.rs`.
    pub fn router(&self) -> Router {
        let state = AppState::new(
            self.events.clone(),
            self.states.clone(),
            self.audit.clone(),
            self.bus.clone(),
            Arc::clone(&self.clock),
            ApiSettings {
                customer_events_topic: EVENTS_TOPIC.to_owned(),
                ..ApiSettings::default()
            },
        );
        routes::app(state)
    }
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
