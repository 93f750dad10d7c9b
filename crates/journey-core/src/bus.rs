//! Message bus abstractions.
//!
//! The bus is partitioned: every message carries a key, and all messages
//! with the same key land on the same partition in send order. Consumers
//! commit offsets explicitly; an uncommitted record is delivered again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A message to be appended to a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination topic.
    pub topic: String,
    /// Partition key. Messages sharing a key keep their relative order.
    pub key: Option<String>,
    /// Serialized payload.
    pub payload: String,
}

impl OutboundMessage {
    /// Creates a keyed message.
    #[must_use]
    pub fn keyed(topic: impl Into<String>, key: impl Into<String>, payload: String) -> Self {
        Self {
            topic: topic.into(),
            key: Some(key.into()),
            payload,
        }
    }
}

/// Acknowledgement returned once the bus has durably accepted a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Partition the message was written to.
    pub partition: u32,
    /// Offset of the message within its partition.
    pub offset: u64,
}

/// A record read from a topic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedRecord {
    /// Topic the record was read from.
    pub topic: String,
    /// Partition the record was read from.
    pub partition: u32,
    /// Offset of the record within its partition.
    pub offset: u64,
    /// Partition key, if the producer supplied one.
    pub key: Option<String>,
    /// Raw payload.
    pub value: String,
    /// When the bus accepted the record.
    pub appended_at: DateTime<Utc>,
}

/// Partition a message key is routed to among `partitions` partitions.
///
/// Uses 64-bit FNV-1a so the routing is identical across processes and
/// builds. Unkeyed messages go to partition 0.
#[must_use]
pub fn partition_for(key: Option<&str>, partitions: u32) -> u32 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    let Some(key) = key else {
        return 0;
    };
    let hash = key
        .bytes()
        .fold(OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(PRIME));
    u32::try_from(hash % u64::from(partitions.max(1))).unwrap_or(0)
}

/// Producer side of the bus.
#[async_trait]
pub trait MessageProducer: Send + Sync {
    /// Sends a message and waits for the bus to acknowledge it.
    async fn send(&self, message: OutboundMessage) -> Result<DeliveryReceipt, DomainError>;
}

/// Consumer-group side of the bus with manual offset commitment.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Number of partitions of `topic`.
    fn partition_count(&self, topic: &str) -> u32;

    /// Waits for and returns the next uncommitted record of a partition.
    async fn next_record(&self, topic: &str, partition: u32)
    -> Result<ConsumedRecord, DomainError>;

    /// Marks `record` and everything before it in its partition as handled.
    async fn commit(&self, record: &ConsumedRecord) -> Result<(), DomainError>;

    /// Moves the read position of the record's partition back to the last
    /// committed offset so that `record` is delivered again.
    async fn rewind(&self, record: &ConsumedRecord) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_for_is_stable_and_in_range() {
        let first = partition_for(Some("C1-ABCDEFGHIJ"), 8);
        let second = partition_for(Some("C1-ABCDEFGHIJ"), 8);

        assert_eq!(first, second);
        assert!(first < 8);
    }

    #[test]
    fn test_partition_for_spreads_keys() {
        let used: std::collections::BTreeSet<u32> = (0..64)
            .map(|i| partition_for(Some(&format!("C{i}")), 4))
            .collect();

        assert_eq!(used.len(), 4);
    }

    #[test]
    fn test_unkeyed_and_single_partition_route_to_zero() {
        assert_eq!(partition_for(None, 8), 0);
        assert_eq!(partition_for(Some("C1"), 1), 0);
        assert_eq!(partition_for(Some("C1"), 0), 0);
    }
}
