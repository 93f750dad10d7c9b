//! In-memory partitioned bus for tests.
//!
//! Each topic is a fixed number of append-only partition logs, routed with
//! [`journey_core::bus::partition_for`] like the Postgres queue adapter.
//! The bus tracks one consumer group: per partition a committed offset and
//! a read position that [`RecordSource::rewind`] moves back to the
//! committed offset.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use journey_core::bus::{
    ConsumedRecord, DeliveryReceipt, MessageProducer, OutboundMessage, RecordSource,
    partition_for,
};
use journey_core::clock::Clock;
use journey_core::error::DomainError;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct PartitionLog {
    records: Vec<ConsumedRecord>,
    committed: u64,
    position: u64,
    appended: Arc<Notify>,
}

/// Partitioned in-memory log implementing both bus ports.
pub struct LocalBus {
    partitions: u32,
    topics: Mutex<HashMap<String, Vec<PartitionLog>>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBus")
            .field("partitions", &self.partitions)
            .finish_non_exhaustive()
    }
}

impl LocalBus {
    /// Creates a bus whose topics have `partitions` partitions (at least 1).
    #[must_use]
    pub fn new(partitions: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            partitions: partitions.max(1),
            topics: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Partition `key` is routed to.
    #[must_use]
    pub fn partition_for(&self, key: Option<&str>) -> u32 {
        partition_for(key, self.partitions)
    }

    /// All records of `topic`, partition by partition.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Unknown` if the bus lock is poisoned.
    pub fn records(&self, topic: &str) -> Result<Vec<ConsumedRecord>, DomainError> {
        let topics = self.lock()?;
        Ok(topics
            .get(topic)
            .map(|logs| logs.iter().flat_map(|log| log.records.clone()).collect())
            .unwrap_or_default())
    }

    /// Next offset the consumer group will start from after a restart.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Unknown` if the bus lock is poisoned.
    pub fn committed_offset(&self, topic: &str, partition: u32) -> Result<u64, DomainError> {
        let topics = self.lock()?;
        Ok(topics
            .get(topic)
            .and_then(|logs| logs.get(partition as usize))
            .map_or(0, |log| log.committed))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<PartitionLog>>>, DomainError> {
        self.topics
            .lock()
            .map_err(|_| DomainError::Unknown("local bus lock poisoned".to_owned()))
    }

    fn with_log<T>(
        &self,
        topic: &str,
        partition: u32,
        f: impl FnOnce(&mut PartitionLog) -> T,
    ) -> Result<T, DomainError> {
        if partition >= self.partitions {
            return Err(DomainError::Validation(format!(
                "partition {partition} out of range for topic {topic}"
            )));
        }
        let mut topics = self.lock()?;
        let logs = topics
            .entry(topic.to_owned())
            .or_insert_with(|| (0..self.partitions).map(|_| PartitionLog::default()).collect());
        Ok(f(&mut logs[partition as usize]))
    }
}

#[async_trait]
impl MessageProducer for LocalBus {
    async fn send(&self, message: OutboundMessage) -> Result<DeliveryReceipt, DomainError> {
        let partition = self.partition_for(message.key.as_deref());
        let appended_at = self.clock.now();
        self.with_log(&message.topic.clone(), partition, move |log| {
            let offset = log.records.len() as u64;
            log.records.push(ConsumedRecord {
                topic: message.topic,
                partition,
                offset,
                key: message.key,
                value: message.payload,
                appended_at,
            });
            log.appended.notify_one();
            DeliveryReceipt { partition, offset }
        })
    }
}

#[async_trait]
impl RecordSource for LocalBus {
    fn partition_count(&self, _topic: &str) -> u32 {
        self.partitions
    }

    async fn next_record(
        &self,
        topic: &str,
        partition: u32,
    ) -> Result<ConsumedRecord, DomainError> {
        loop {
            let next = self.with_log(topic, partition, |log| {
                match log.records.get(log.position as usize) {
                    Some(record) => {
                        log.position += 1;
                        Ok(record.clone())
                    }
                    None => Err(Arc::clone(&log.appended)),
                }
            })?;
            match next {
                Ok(record) => return Ok(record),
                // notify_one stores a permit, so an append between the
                // check and this await is not lost.
                Err(appended) => appended.notified().await,
            }
        }
    }

    async fn commit(&self, record: &ConsumedRecord) -> Result<(), DomainError> {
        self.with_log(&record.topic, record.partition, |log| {
            log.committed = log.committed.max(record.offset + 1);
        })
    }

    async fn rewind(&self, record: &ConsumedRecord) -> Result<(), DomainError> {
        self.with_log(&record.topic, record.partition, |log| {
            log.position = log.committed;
        })
    }
}
