//! Shared application state.

use std::sync::Arc;

use journey_card_application::application::ports::{ActionAuditSink, EventStore, StateStore};
use journey_core::bus::MessageProducer;
use journey_core::clock::Clock;

use crate::config::SERVICE_NAME;

/// Settings the HTTP handlers need from the configuration.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub service_name: String,
    /// Topic test events are injected into.
    pub customer_events_topic: String,
    /// Recent-actions limit used when the request names none.
    pub dashboard_recent_limit: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME.to_owned(),
            customer_events_topic: "customer-events".to_owned(),
            dashboard_recent_limit: 10,
        }
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub event_store: Arc<dyn EventStore>,
    pub state_store: Arc<dyn StateStore>,
    pub action_audit: Arc<dyn ActionAuditSink>,
    /// Producer for the inbound topic, used by test event injection.
    pub producer: Arc<dyn MessageProducer>,
    pub clock: Arc<dyn Clock>,
    pub settings: Arc<ApiSettings>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        event_store: Arc<dyn EventStore>,
        state_store: Arc<dyn StateStore>,
        action_audit: Arc<dyn ActionAuditSink>,
        producer: Arc<dyn MessageProducer>,
        clock: Arc<dyn Clock>,
        settings: ApiSettings,
    ) -> Self {
        Self {
            event_store,
            state_store,
            action_audit,
            producer,
            clock,
            settings: Arc::new(settings),
        }
    }
}
