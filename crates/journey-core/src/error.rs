//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// Every failure in the pipeline is expressed as one of these variants so
/// that the ingestion layer can decide between skipping, dead-lettering and
/// redelivery without inspecting driver-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Malformed input that can never become valid.
    #[error("validation error: {0}")]
    Validation(String),

    /// A state transition that the journey state machine does not allow.
    #[error("invalid transition for customer {customer_id}: {from} -> {to}")]
    InvalidTransition {
        /// The customer whose journey rejected the transition.
        customer_id: String,
        /// The step the journey was in.
        from: String,
        /// The step that was requested.
        to: String,
    },

    /// Well-formed input that violates a business rule for the current state.
    #[error("business rule violated: {0}")]
    BusinessRule(String),

    /// A dependency (store, bus) is unavailable or failed.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// Another worker holds the claim for the same idempotency key.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Anything that fits no other class.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl DomainError {
    /// Returns `true` when retrying the same input later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Infrastructure(_) | Self::Conflict(_))
    }

    /// Returns `true` for deterministic failures raised by domain logic.
    #[must_use]
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidTransition { .. } | Self::BusinessRule(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_and_conflict_are_retryable() {
        assert!(DomainError::Infrastructure("redis down".into()).is_retryable());
        assert!(DomainError::Conflict("in flight".into()).is_retryable());
        assert!(!DomainError::Validation("blank".into()).is_retryable());
        assert!(!DomainError::Unknown("boom".into()).is_retryable());
    }

    #[test]
    fn test_domain_failures_are_business() {
        let invalid = DomainError::InvalidTransition {
            customer_id: "C1".into(),
            from: "APPROVED".into(),
            to: "REJECTED".into(),
        };
        assert!(invalid.is_business());
        assert!(DomainError::BusinessRule("not enough documents".into()).is_business());
        assert!(!DomainError::Conflict("in flight".into()).is_business());
    }

    #[test]
    fn test_invalid_transition_message_names_both_steps() {
        let err = DomainError::InvalidTransition {
            customer_id: "C1".into(),
            from: "APPLIED".into(),
            to: "APPROVED".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid transition for customer C1: APPLIED -> APPROVED"
        );
    }
}
