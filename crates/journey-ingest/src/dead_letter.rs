//! Dead-letter envelope.

use std::error::Error;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use journey_core::bus::ConsumedRecord;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Longest trace excerpt carried in an envelope, in characters.
pub const MAX_TRACE_CHARS: usize = 500;

/// A record that could not be processed, with the context needed to
/// replay it by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub original_topic: String,
    pub original_partition: u32,
    pub original_offset: u64,
    pub original_key: Option<String>,
    pub original_value: String,
    pub error_type: String,
    pub error_message: String,
    pub stack_trace: String,
    pub timestamp: DateTime<Utc>,
}

impl DeadLetter {
    #[must_use]
    pub fn new(
        record: &ConsumedRecord,
        error_type: &str,
        error: &IngestError,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            original_topic: record.topic.clone(),
            original_partition: record.partition,
            original_offset: record.offset,
            original_key: record.key.clone(),
            original_value: record.value.clone(),
            error_type: error_type.to_owned(),
            error_message: error.to_string(),
            stack_trace: trace_excerpt(error),
            timestamp,
        }
    }
}

/// Debug rendering of `error` followed by its `source()` chain, cut at
/// [`MAX_TRACE_CHARS`].
#[must_use]
pub fn trace_excerpt(error: &(dyn Error + 'static)) -> String {
    let mut trace = format!("{error:?}");
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(trace, "\ncaused by: {cause}");
        source = cause.source();
    }
    trace.chars().take(MAX_TRACE_CHARS).collect()
}
