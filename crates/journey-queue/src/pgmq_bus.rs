//! Partitioned bus over pgmq.
//!
//! A topic with `n` partitions is `n` queues named `{topic}_p{partition}`.
//! Keys are routed with [`journey_core::bus::partition_for`]. A read leases
//! the oldest visible message for the visibility timeout; committing deletes
//! it and rewinding makes it visible again at once. Each partition queue is
//! read by a single worker, so the lease never lets a later message
//! overtake an uncommitted one while the process is alive.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use journey_core::bus::{
    ConsumedRecord, DeliveryReceipt, MessageProducer, OutboundMessage, RecordSource,
    partition_for,
};
use journey_core::clock::Clock;
use journey_core::error::DomainError;
use pgmq::PGMQueue;
use pgmq::types::Message;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};

use crate::queue_error;

/// Queue layout and polling behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    /// Partitions of every topic.
    pub partitions: u32,
    /// How long a read record stays hidden from other reads.
    pub visibility_timeout: Duration,
    /// Pause between reads of an empty partition queue.
    pub poll_interval: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            partitions: 10,
            visibility_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Body of a queued message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct QueuedRecord {
    key: Option<String>,
    value: String,
}

impl QueuedRecord {
    /// Messages written by other producers are passed on verbatim so the
    /// gateway can dead-letter them.
    fn from_json(body: serde_json::Value) -> Self {
        serde_json::from_value::<Self>(body.clone()).unwrap_or_else(|_| Self {
            key: None,
            value: body.to_string(),
        })
    }
}

/// pgmq-backed implementation of both bus ports.
#[derive(Clone)]
pub struct PgmqBus {
    queue: PGMQueue,
    pool: PgPool,
    settings: QueueSettings,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PgmqBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgmqBus")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PgmqBus {
    /// Creates a bus on an existing connection pool.
    pub async fn new(pool: PgPool, settings: QueueSettings, clock: Arc<dyn Clock>) -> Self {
        let queue = PGMQueue::new_with_pool(pool.clone()).await;
        let settings = QueueSettings {
            partitions: settings.partitions.max(1),
            ..settings
        };
        Self {
            queue,
            pool,
            settings,
            clock,
        }
    }

    /// Name of the queue holding `partition` of `topic`. pgmq only accepts
    /// alphanumerics and underscores.
    #[must_use]
    pub fn queue_name(topic: &str, partition: u32) -> String {
        let topic: String = topic
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{topic}_p{partition}")
    }

    /// Partition `key` is routed to.
    #[must_use]
    pub fn partition_for(&self, key: Option<&str>) -> u32 {
        partition_for(key, self.settings.partitions)
    }

    /// Creates the partition queues of `topic` if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a queue cannot be created.
    #[instrument(skip(self))]
    pub async fn ensure_topic(&self, topic: &str) -> Result<(), DomainError> {
        for partition in 0..self.settings.partitions {
            let name = Self::queue_name(topic, partition);
            self.queue
                .create(&name)
                .await
                .map_err(queue_error("create", &name))?;
        }
        info!(partitions = self.settings.partitions, "topic queues ready");
        Ok(())
    }

    /// Makes records leased by a previous process visible again so they are
    /// redelivered in order instead of after their visibility timeout.
    /// Returns the number of released records.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a queue cannot be updated.
    #[instrument(skip(self))]
    pub async fn release_in_flight(&self, topic: &str) -> Result<u64, DomainError> {
        let mut released = 0;
        for partition in 0..self.settings.partitions {
            let name = Self::queue_name(topic, partition);
            // The name is built from [a-z0-9_] only.
            let sql = format!("UPDATE pgmq.q_{name} SET vt = now() WHERE vt > now()");
            let result = sqlx::query(&sql)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::Infrastructure(format!("release on {name} failed: {e}"))
                })?;
            released += result.rows_affected();
        }
        if released > 0 {
            warn!(released, "released records leased by a previous run");
        }
        Ok(released)
    }

    fn visibility_seconds(&self) -> i32 {
        i32::try_from(self.settings.visibility_timeout.as_secs())
            .unwrap_or(i32::MAX)
            .max(1)
    }

    fn to_record(
        topic: &str,
        partition: u32,
        message: Message<serde_json::Value>,
    ) -> Result<ConsumedRecord, DomainError> {
        let offset = u64::try_from(message.msg_id).map_err(|_| {
            DomainError::Infrastructure(format!("negative message id {}", message.msg_id))
        })?;
        let body = QueuedRecord::from_json(message.message);
        Ok(ConsumedRecord {
            topic: topic.to_owned(),
            partition,
            offset,
            key: body.key,
            value: body.value,
            appended_at: message.enqueued_at,
        })
    }
}

fn message_id(record: &ConsumedRecord) -> Result<i64, DomainError> {
    i64::try_from(record.offset)
        .map_err(|_| DomainError::Validation(format!("offset {} out of range", record.offset)))
}

#[async_trait]
impl MessageProducer for PgmqBus {
    #[instrument(skip(self, message), fields(topic = %message.topic))]
    async fn send(&self, message: OutboundMessage) -> Result<DeliveryReceipt, DomainError> {
        let partition = self.partition_for(message.key.as_deref());
        let name = Self::queue_name(&message.topic, partition);
        let body = QueuedRecord {
            key: message.key,
            value: message.payload,
        };
        let msg_id = self
            .queue
            .send(&name, &body)
            .await
            .map_err(queue_error("send", &name))?;
        let offset = u64::try_from(msg_id).map_err(|_| {
            DomainError::Infrastructure(format!("negative message id {msg_id} from {name}"))
        })?;
        debug!(queue = %name, offset, "message enqueued");
        Ok(DeliveryReceipt { partition, offset })
    }
}

#[async_trait]
impl RecordSource for PgmqBus {
    fn partition_count(&self, _topic: &str) -> u32 {
        self.settings.partitions
    }

    async fn next_record(
        &self,
        topic: &str,
        partition: u32,
    ) -> Result<ConsumedRecord, DomainError> {
        if partition >= self.settings.partitions {
            return Err(DomainError::Validation(format!(
                "partition {partition} out of range for topic {topic}"
            )));
        }
        let name = Self::queue_name(topic, partition);
        loop {
            let message: Option<Message<serde_json::Value>> = self
                .queue
                .read(&name, Some(self.visibility_seconds()))
                .await
                .map_err(queue_error("read", &name))?;
            match message {
                Some(message) => return Self::to_record(topic, partition, message),
                None => tokio::time::sleep(self.settings.poll_interval).await,
            }
        }
    }

    async fn commit(&self, record: &ConsumedRecord) -> Result<(), DomainError> {
        let name = Self::queue_name(&record.topic, record.partition);
        let deleted = self
            .queue
            .delete(&name, message_id(record)?)
            .await
            .map_err(queue_error("delete", &name))?;
        if deleted == 0 {
            debug!(queue = %name, offset = record.offset, "record already committed");
        }
        Ok(())
    }

    async fn rewind(&self, record: &ConsumedRecord) -> Result<(), DomainError> {
        let name = Self::queue_name(&record.topic, record.partition);
        self.queue
            .set_vt::<serde_json::Value>(&name, message_id(record)?, self.clock.now())
            .await
            .map_err(queue_error("set_vt", &name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_queue_name_replaces_characters_pgmq_rejects() {
        assert_eq!(
            PgmqBus::queue_name("customer-events", 3),
            "customer_events_p3"
        );
        assert_eq!(
            PgmqBus::queue_name("Customer.Events-DLQ", 0),
            "customer_events_dlq_p0"
        );
    }

    #[test]
    fn test_queued_record_keeps_key_and_value() {
        let body = json!({ "key": "C1", "value": "{\"eventId\":\"E1\"}" });

        let record = QueuedRecord::from_json(body);

        assert_eq!(record.key.as_deref(), Some("C1"));
        assert_eq!(record.value, "{\"eventId\":\"E1\"}");
    }

    #[test]
    fn test_foreign_message_is_passed_on_verbatim() {
        let body = json!({ "eventId": "E1", "customerId": "C1" });

        let record = QueuedRecord::from_json(body.clone());

        assert_eq!(record.key, None);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&record.value).unwrap(),
            body
        );
    }

    #[test]
    fn test_default_settings() {
        let settings = QueueSettings::default();

        assert_eq!(settings.partitions, 10);
        assert_eq!(settings.visibility_timeout, Duration::from_secs(30));
    }
}
