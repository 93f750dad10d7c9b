//! Ingestion gateway.
//!
//! Turns one consumed record into a commit decision:
//!
//! | failure        | dead-lettered | offset      |
//! |----------------|---------------|-------------|
//! | none           | no            | commit      |
//! | parse          | `PARSE_ERROR`   | commit      |
//! | business       | `BUSINESS_ERROR`| commit      |
//! | transient      | no            | redeliver   |
//! | unknown, panic | `UNKNOWN_ERROR` | commit      |

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use journey_card_application::application::orchestrator::{Orchestrator, ProcessingOutcome};
use journey_card_application::domain::events::CustomerEvent;
use journey_core::bus::{ConsumedRecord, MessageProducer, OutboundMessage};
use journey_core::clock::Clock;
use journey_core::error::DomainError;
use opentelemetry::KeyValue;
use opentelemetry::metrics::Counter;
use tracing::{error, info, instrument, warn};

use crate::dead_letter::DeadLetter;
use crate::error::{FailureClass, IngestError};
use crate::payload::parse_event;

/// What the partition worker does with the record's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Commit,
    Redeliver,
}

/// Processes parsed events. Implemented by the orchestrator.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    async fn process(&self, event: &CustomerEvent) -> Result<ProcessingOutcome, DomainError>;
}

#[async_trait]
impl EventProcessor for Orchestrator {
    async fn process(&self, event: &CustomerEvent) -> Result<ProcessingOutcome, DomainError> {
        Orchestrator::process(self, event).await
    }
}

/// Classifies record failures and routes them to retry or dead-letter.
pub struct IngestionGateway {
    processor: Arc<dyn EventProcessor>,
    dead_letters: Arc<dyn MessageProducer>,
    dead_letter_topic: String,
    clock: Arc<dyn Clock>,
    dead_lettered: Counter<u64>,
}

impl IngestionGateway {
    #[must_use]
    pub fn new(
        processor: Arc<dyn EventProcessor>,
        dead_letters: Arc<dyn MessageProducer>,
        dead_letter_topic: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dead_lettered = opentelemetry::global::meter("journey-ingest")
            .u64_counter("journey.ingest.dead_lettered")
            .with_description("Inbound records routed to the dead-letter topic")
            .build();
        Self {
            processor,
            dead_letters,
            dead_letter_topic: dead_letter_topic.into(),
            clock,
            dead_lettered,
        }
    }

    /// Handles one record and returns what to do with its offset.
    #[instrument(
        skip(self, record),
        fields(topic = %record.topic, partition = record.partition, offset = record.offset)
    )]
    pub async fn handle_record(&self, record: &ConsumedRecord) -> Disposition {
        info!(key = record.key.as_deref(), "event received");

        let result = match parse_event(&record.value) {
            Ok(event) => self.process(event).await,
            Err(e) => Err(e),
        };
        let Err(failure) = result else {
            return Disposition::Commit;
        };

        let class = failure.class();
        match class.error_type() {
            None => {
                warn!(error = %failure, "transient failure, record will be redelivered");
                Disposition::Redeliver
            }
            Some(error_type) => {
                if class == FailureClass::Unknown {
                    error!(error = %failure, error_type, "unclassified failure");
                } else {
                    warn!(error = %failure, error_type, "record rejected");
                }
                self.dead_letter(record, error_type, &failure).await;
                Disposition::Commit
            }
        }
    }

    /// Runs the processor on its own task so that a panic surfaces as an
    /// error instead of taking the partition worker down.
    async fn process(&self, event: CustomerEvent) -> Result<(), IngestError> {
        let processor = Arc::clone(&self.processor);
        let handle = tokio::spawn(async move { processor.process(&event).await });
        match handle.await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(IngestError::Domain(e)),
            Err(join_error) if join_error.is_panic() => Err(IngestError::Panicked(
                panic_message(join_error.into_panic().as_ref()),
            )),
            Err(join_error) => Err(IngestError::Domain(DomainError::Unknown(format!(
                "event processing task failed: {join_error}"
            )))),
        }
    }

    async fn dead_letter(&self, record: &ConsumedRecord, error_type: &str, failure: &IngestError) {
        self.dead_lettered
            .add(1, &[KeyValue::new("error_type", error_type.to_owned())]);

        let letter = DeadLetter::new(record, error_type, failure, self.clock.now());
        let payload = match serde_json::to_string(&letter) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "failed to encode dead letter");
                return;
            }
        };
        let message = OutboundMessage {
            topic: self.dead_letter_topic.clone(),
            key: record.key.clone(),
            payload,
        };
        match self.dead_letters.send(message).await {
            Ok(receipt) => warn!(
                error_type,
                dlq_partition = receipt.partition,
                dlq_offset = receipt.offset,
                "record sent to dead-letter topic"
            ),
            Err(e) => error!(error = %e, error_type, "failed to send dead letter"),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
