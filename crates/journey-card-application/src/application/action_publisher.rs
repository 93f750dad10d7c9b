//! Idempotent action publication.
//!
//! Publishing an action touches three stores that share no transaction: the
//! coordination store, the message bus and the action audit table. The
//! publisher runs them as claim, act, then finalize-or-release:
//!
//! 1. claim `<prefix><action_id>` = `PROCESSING` if absent, short TTL;
//! 2. send the action keyed by customer and wait for the acknowledgement,
//!    then upsert the audit row;
//! 3. on success set the key to `DONE` with a long TTL, on failure delete
//!    it so that a redelivery can try again.
//!
//! A crash between 1 and 3 leaves a `PROCESSING` key that expires with its
//! TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use journey_core::bus::{MessageProducer, OutboundMessage};
use journey_core::coordination::CoordinationStore;
use journey_core::error::DomainError;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram};
use tracing::{debug, info, instrument, warn};

use super::ports::{ActionAuditSink, ActionPublisher, PublishOutcome};
use crate::domain::action::Action;

/// Coordination value while a publish is in flight.
pub const PROCESSING_STATUS: &str = "PROCESSING";

/// Coordination value once an action has been published.
pub const DONE_STATUS: &str = "DONE";

/// Claim attempts before an unreadable claim is reported as a conflict.
const CLAIM_ATTEMPTS: usize = 2;

/// Tunables of the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherSettings {
    /// Topic actions are sent to.
    pub topic: String,
    /// Prefix of the coordination keys.
    pub key_prefix: String,
    /// Lifetime of an in-flight claim.
    pub processing_ttl: Duration,
    /// Lifetime of the published marker.
    pub done_ttl: Duration,
    /// Upper bound on waiting for the bus acknowledgement.
    pub ack_timeout: Duration,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            topic: "actions".to_owned(),
            key_prefix: "action:status:".to_owned(),
            processing_ttl: Duration::from_secs(5 * 60),
            done_ttl: Duration::from_secs(24 * 60 * 60),
            ack_timeout: Duration::from_millis(3000),
        }
    }
}

enum Claim {
    Acquired,
    AlreadyDone,
}

struct PublisherMetrics {
    outcomes: Counter<u64>,
    latency_ms: Histogram<f64>,
}

impl PublisherMetrics {
    fn new() -> Self {
        let meter = opentelemetry::global::meter("journey-card-application");
        Self {
            outcomes: meter
                .u64_counter("journey.actions.published")
                .with_description("Action publish attempts by outcome")
                .build(),
            latency_ms: meter
                .f64_histogram("journey.actions.publish_latency")
                .with_description("Time spent publishing one action")
                .with_unit("ms")
                .build(),
        }
    }

    fn record(&self, result: &Result<PublishOutcome, DomainError>, elapsed: Duration) {
        let outcome = match result {
            Ok(PublishOutcome::Published) => "success",
            Ok(PublishOutcome::Duplicate) => "duplicate",
            Err(DomainError::Conflict(_)) => "conflict",
            Err(_) => "failure",
        };
        self.outcomes.add(1, &[KeyValue::new("outcome", outcome)]);
        self.latency_ms.record(elapsed.as_secs_f64() * 1000.0, &[]);
    }
}

/// [`ActionPublisher`] that guarantees at most one send per `action_id`.
pub struct IdempotentActionPublisher {
    coordination: Arc<dyn CoordinationStore>,
    producer: Arc<dyn MessageProducer>,
    audit: Arc<dyn ActionAuditSink>,
    settings: PublisherSettings,
    metrics: PublisherMetrics,
}

impl IdempotentActionPublisher {
    #[must_use]
    pub fn new(
        coordination: Arc<dyn CoordinationStore>,
        producer: Arc<dyn MessageProducer>,
        audit: Arc<dyn ActionAuditSink>,
        settings: PublisherSettings,
    ) -> Self {
        Self {
            coordination,
            producer,
            audit,
            settings,
            metrics: PublisherMetrics::new(),
        }
    }

    /// Coordination key guarding `action`.
    #[must_use]
    pub fn status_key(&self, action: &Action) -> String {
        format!("{}{}", self.settings.key_prefix, action.action_id)
    }

    async fn claim(&self, key: &str) -> Result<Claim, DomainError> {
        for _ in 0..CLAIM_ATTEMPTS {
            if self
                .coordination
                .claim(key, PROCESSING_STATUS, self.settings.processing_ttl)
                .await?
            {
                return Ok(Claim::Acquired);
            }
            match self.coordination.get(key).await?.as_deref() {
                Some(DONE_STATUS) => return Ok(Claim::AlreadyDone),
                Some(PROCESSING_STATUS) => {
                    return Err(DomainError::Conflict(format!(
                        "publish of {key} already in progress"
                    )));
                }
                Some(other) => {
                    return Err(DomainError::Conflict(format!(
                        "unexpected status {other} for {key}"
                    )));
                }
                // Released or expired between the claim and the read.
                None => {}
            }
        }
        Err(DomainError::Conflict(format!("could not claim {key}")))
    }

    async fn send_and_audit(&self, action: &Action) -> Result<(), DomainError> {
        let payload = serde_json::to_string(action)
            .map_err(|e| DomainError::Unknown(format!("action serialization failed: {e}")))?;
        let message = OutboundMessage::keyed(
            self.settings.topic.as_str(),
            action.customer_id.as_str(),
            payload,
        );

        let receipt = tokio::time::timeout(self.settings.ack_timeout, self.producer.send(message))
            .await
            .map_err(|_| {
                DomainError::Infrastructure(format!(
                    "send of action {} not acknowledged within {} ms",
                    action.action_id,
                    self.settings.ack_timeout.as_millis()
                ))
            })??;
        debug!(
            action_id = %action.action_id,
            partition = receipt.partition,
            offset = receipt.offset,
            "action acknowledged by bus"
        );

        self.audit.record(action).await?;
        Ok(())
    }

    async fn publish_claimed(
        &self,
        key: &str,
        action: &Action,
    ) -> Result<PublishOutcome, DomainError> {
        match self.send_and_audit(action).await {
            Ok(()) => {
                if let Err(e) = self
                    .coordination
                    .set(key, DONE_STATUS, self.settings.done_ttl)
                    .await
                {
                    // The message is out; the PROCESSING claim still blocks
                    // resends until its TTL runs out.
                    warn!(
                        action_id = %action.action_id,
                        error = %e,
                        "failed to mark action as done"
                    );
                }
                info!(
                    action_id = %action.action_id,
                    customer_id = %action.customer_id,
                    action_type = %action.action_type,
                    channel = %action.channel,
                    "action published"
                );
                Ok(PublishOutcome::Published)
            }
            Err(e) => {
                if let Err(release_error) = self.coordination.delete(key).await {
                    warn!(
                        action_id = %action.action_id,
                        error = %release_error,
                        "failed to release action claim"
                    );
                }
                warn!(
                    action_id = %action.action_id,
                    error = %e,
                    "action publish failed, claim released"
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ActionPublisher for IdempotentActionPublisher {
    #[instrument(
        skip(self, action),
        fields(action_id = %action.action_id, customer_id = %action.customer_id)
    )]
    async fn publish(&self, action: &Action) -> Result<PublishOutcome, DomainError> {
        let started = Instant::now();
        let key = self.status_key(action);

        let result = match self.claim(&key).await {
            Ok(Claim::Acquired) => self.publish_claimed(&key, action).await,
            Ok(Claim::AlreadyDone) => {
                info!(action_id = %action.action_id, "duplicate action skipped");
                Ok(PublishOutcome::Duplicate)
            }
            Err(e) => Err(e),
        };

        self.metrics.record(&result, started.elapsed());
        result
    }
}
