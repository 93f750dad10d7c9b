//! Runtime configuration read from environment variables.

use std::str::FromStr;
use std::time::Duration;

use journey_card_application::application::action_publisher::PublisherSettings;
use journey_card_application::application::query_handlers::clamp_limit;
use journey_card_application::domain::messages::Locale;
use journey_card_application::domain::state::DocumentRequirement;
use journey_ingest::worker::WorkerSettings;
use journey_queue::pgmq_bus::QueueSettings;

use crate::error::AppError;

/// Name reported by the health endpoint and attached to telemetry.
pub const SERVICE_NAME: &str = "journey-orchestrator";

/// Typed configuration of one orchestrator instance.
#[derive(Debug, Clone)]
pub struct JourneyConfig {
    pub database_url: String,
    pub redis_url: String,
    pub host: String,
    pub port: u16,
    pub document_requirement: DocumentRequirement,
    pub locale: Locale,
    pub partitions: u32,
    pub customer_events_topic: String,
    pub actions_topic: String,
    pub dead_letter_topic: String,
    pub publish_ack_timeout: Duration,
    pub state_prefix: String,
    pub state_ttl: Duration,
    pub idempotency_prefix: String,
    pub processing_ttl: Duration,
    pub idempotency_ttl: Duration,
    pub redelivery_backoff: Duration,
    pub queue_visibility_timeout: Duration,
    pub queue_poll_interval: Duration,
    pub dashboard_recent_limit: u32,
    /// OTLP collector; telemetry export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl JourneyConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a variable
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a variable
    /// cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let vars = Vars(&lookup);
        Ok(Self {
            database_url: vars
                .get("DATABASE_URL")
                .ok_or_else(|| AppError::Config("DATABASE_URL must be set".to_owned()))?,
            redis_url: vars.string_or("REDIS_URL", "redis://127.0.0.1:6379"),
            host: vars.string_or("HOST", "0.0.0.0"),
            port: vars.parse_or("PORT", 3000)?,
            document_requirement: DocumentRequirement::new(
                vars.parse_or("JOURNEY_REQUIRED_DOCUMENT_COUNT", 2)?,
            ),
            locale: vars.parse_or("JOURNEY_LOCALE", Locale::Tr)?,
            partitions: vars.parse_or::<u32>("JOURNEY_PARTITIONS", 10)?.max(1),
            customer_events_topic: vars
                .string_or("JOURNEY_TOPIC_CUSTOMER_EVENTS", "customer-events"),
            actions_topic: vars.string_or("JOURNEY_TOPIC_ACTIONS", "actions"),
            dead_letter_topic: vars.string_or("JOURNEY_TOPIC_DLQ", "customer-events-dlq"),
            publish_ack_timeout: Duration::from_millis(
                vars.parse_or("JOURNEY_PUBLISH_ACK_TIMEOUT_MS", 3000)?,
            ),
            state_prefix: vars.string_or("JOURNEY_STATE_PREFIX", "journey:state:"),
            state_ttl: days(vars.parse_or("JOURNEY_STATE_TTL_DAYS", 30)?),
            idempotency_prefix: vars.string_or("JOURNEY_IDEMPOTENCY_PREFIX", "action:status:"),
            processing_ttl: minutes(vars.parse_or("JOURNEY_PROCESSING_TTL_MINUTES", 5)?),
            idempotency_ttl: hours(vars.parse_or("JOURNEY_IDEMPOTENCY_TTL_HOURS", 24)?),
            redelivery_backoff: Duration::from_millis(
                vars.parse_or("JOURNEY_REDELIVERY_BACKOFF_MS", 1000)?,
            ),
            queue_visibility_timeout: Duration::from_secs(
                vars.parse_or("JOURNEY_QUEUE_VISIBILITY_TIMEOUT_SECS", 30)?,
            ),
            queue_poll_interval: Duration::from_millis(
                vars.parse_or("JOURNEY_QUEUE_POLL_INTERVAL_MS", 250)?,
            ),
            dashboard_recent_limit: clamp_limit(
                Some(vars.parse_or("JOURNEY_DASHBOARD_RECENT_LIMIT", 10)?),
                10,
            ),
            otlp_endpoint: vars
                .get("OTEL_EXPORTER_OTLP_ENDPOINT")
                .filter(|endpoint| !endpoint.trim().is_empty()),
        })
    }

    /// Settings for the idempotent action publisher.
    #[must_use]
    pub fn publisher_settings(&self) -> PublisherSettings {
        PublisherSettings {
            topic: self.actions_topic.clone(),
            key_prefix: self.idempotency_prefix.clone(),
            processing_ttl: self.processing_ttl,
            done_ttl: self.idempotency_ttl,
            ack_timeout: self.publish_ack_timeout,
        }
    }

    /// Layout and polling of the pgmq partition queues.
    #[must_use]
    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            partitions: self.partitions,
            visibility_timeout: self.queue_visibility_timeout,
            poll_interval: self.queue_poll_interval,
        }
    }

    /// Settings for the inbound partition workers.
    #[must_use]
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            topic: self.customer_events_topic.clone(),
            redelivery_backoff: self.redelivery_backoff,
        }
    }
}

struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
    }

    fn string_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_owned())
    }

    fn parse_or<T>(&self, name: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("{name} is invalid ({raw}): {e}"))),
        }
    }
}

fn minutes(count: u64) -> Duration {
    Duration::from_secs(count * 60)
}

fn hours(count: u64) -> Duration {
    minutes(count * 60)
}

fn days(count: u64) -> Duration {
    hours(count * 24)
}
