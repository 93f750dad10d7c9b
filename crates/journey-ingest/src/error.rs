//! Failures of a single inbound record.

use journey_core::error::DomainError;
use thiserror::Error;

/// Dead-letter error class for undecodable records.
pub const PARSE_ERROR: &str = "PARSE_ERROR";
/// Dead-letter error class for records the domain rejected.
pub const BUSINESS_ERROR: &str = "BUSINESS_ERROR";
/// Dead-letter error class for everything else.
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// How the gateway disposes of a failed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Parse,
    Business,
    /// A dependency is unreachable; the record is redelivered.
    Transient,
    Unknown,
}

impl FailureClass {
    /// Dead-letter `errorType`, or `None` for redelivered failures.
    #[must_use]
    pub fn error_type(self) -> Option<&'static str> {
        match self {
            Self::Parse => Some(PARSE_ERROR),
            Self::Business => Some(BUSINESS_ERROR),
            Self::Unknown => Some(UNKNOWN_ERROR),
            Self::Transient => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed event payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("undecodable event type: {0}")]
    UnknownEventType(#[source] DomainError),

    #[error("undecodable timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("event processing panicked: {0}")]
    Panicked(String),
}

impl IngestError {
    #[must_use]
    pub fn class(&self) -> FailureClass {
        match self {
            Self::MalformedPayload(_)
            | Self::UnknownEventType(_)
            | Self::InvalidTimestamp { .. } => FailureClass::Parse,
            Self::Domain(e) if e.is_business() => FailureClass::Business,
            Self::Domain(e) if e.is_retryable() => FailureClass::Transient,
            Self::Domain(_) | Self::Panicked(_) => FailureClass::Unknown,
        }
    }
}
