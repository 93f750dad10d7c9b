//! Message producer double.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use journey_core::bus::{DeliveryReceipt, MessageProducer, OutboundMessage};
use journey_core::error::DomainError;

/// A producer that records every acknowledged message. It can be made to
/// fail, or to wait before acknowledging.
#[derive(Debug, Default)]
pub struct RecordingProducer {
    sent: Mutex<Vec<OutboundMessage>>,
    failing: AtomicBool,
    ack_delay: Option<Duration>,
}

impl RecordingProducer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A producer that acknowledges each message only after `delay`.
    #[must_use]
    pub fn with_ack_delay(delay: Duration) -> Self {
        Self {
            ack_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Makes every subsequent send fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of all acknowledged messages, in send order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Acknowledged messages sent to `topic`.
    #[must_use]
    pub fn sent_to(&self, topic: &str) -> Vec<OutboundMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }
}

#[async_trait]
impl MessageProducer for RecordingProducer {
    async fn send(&self, message: OutboundMessage) -> Result<DeliveryReceipt, DomainError> {
        if let Some(delay) = self.ack_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::Infrastructure("broker unavailable".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message);
        Ok(DeliveryReceipt {
            partition: 0,
            offset: (sent.len() - 1) as u64,
        })
    }
}
