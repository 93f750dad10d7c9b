//! Partition workers.
//!
//! One task per partition reads records in order, hands each to the
//! gateway and then commits or rewinds. Records of one partition are never
//! processed concurrently, which gives per-customer ordering.

use std::sync::Arc;
use std::time::Duration;

use journey_core::bus::RecordSource;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::gateway::{Disposition, IngestionGateway};

/// Settings shared by the workers of one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub topic: String,
    /// Pause before an uncommitted record is read again.
    pub redelivery_backoff: Duration,
}

/// Spawns one worker per partition of `settings.topic`. Workers stop when
/// `shutdown` turns `true` or its sender is dropped.
#[must_use]
pub fn spawn_partition_workers(
    source: Arc<dyn RecordSource>,
    gateway: Arc<IngestionGateway>,
    settings: &WorkerSettings,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    (0..source.partition_count(&settings.topic))
        .map(|partition| {
            tokio::spawn(run_partition(
                Arc::clone(&source),
                Arc::clone(&gateway),
                settings.clone(),
                partition,
                shutdown.clone(),
            ))
        })
        .collect()
}

async fn run_partition(
    source: Arc<dyn RecordSource>,
    gateway: Arc<IngestionGateway>,
    settings: WorkerSettings,
    partition: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(topic = %settings.topic, partition, "partition worker started");
    while !*shutdown.borrow() {
        let next = tokio::select! {
            _ = shutdown.changed() => break,
            next = source.next_record(&settings.topic, partition) => next,
        };
        let record = match next {
            Ok(record) => record,
            Err(e) => {
                warn!(partition, error = %e, "failed to read record");
                if pause(settings.redelivery_backoff, &mut shutdown).await {
                    break;
                }
                continue;
            }
        };

        match gateway.handle_record(&record).await {
            Disposition::Commit => {
                if let Err(e) = source.commit(&record).await {
                    warn!(partition, offset = record.offset, error = %e, "offset commit failed");
                } else {
                    debug!(partition, offset = record.offset, "offset committed");
                }
            }
            Disposition::Redeliver => {
                if let Err(e) = source.rewind(&record).await {
                    warn!(partition, offset = record.offset, error = %e, "rewind failed");
                }
                if pause(settings.redelivery_backoff, &mut shutdown).await {
                    break;
                }
            }
        }
    }
    info!(topic = %settings.topic, partition, "partition worker stopped");
}

/// Sleeps for `backoff`. Returns `true` if shutdown was requested meanwhile.
async fn pause(backoff: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = shutdown.changed() => true,
        () = tokio::time::sleep(backoff) => false,
    }
}
