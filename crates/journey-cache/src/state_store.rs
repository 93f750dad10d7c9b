//! Journey state persisted as JSON snapshots under `<prefix><customer_id>`.

use std::time::Duration;

use async_trait::async_trait;
use journey_card_application::application::ports::StateStore;
use journey_card_application::domain::state::{DocumentRequirement, JourneySnapshot, JourneyState};
use journey_core::error::DomainError;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::{redis_error, ttl_seconds};

/// Default key prefix of journey states.
pub const DEFAULT_STATE_PREFIX: &str = "journey:state:";

/// Default lifetime of an idle journey.
pub const DEFAULT_STATE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Redis-backed [`StateStore`]. Every save refreshes the key's expiry.
#[derive(Clone)]
pub struct RedisStateStore {
    connection_manager: ConnectionManager,
    prefix: String,
    ttl: Duration,
    requirement: DocumentRequirement,
}

impl std::fmt::Debug for RedisStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStateStore")
            .field("prefix", &self.prefix)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl RedisStateStore {
    #[must_use]
    pub fn new(
        connection_manager: ConnectionManager,
        prefix: impl Into<String>,
        ttl: Duration,
        requirement: DocumentRequirement,
    ) -> Self {
        Self {
            connection_manager,
            prefix: prefix.into(),
            ttl,
            requirement,
        }
    }

    fn key(&self, customer_id: &str) -> String {
        state_key(&self.prefix, customer_id)
    }
}

pub(crate) fn state_key(prefix: &str, customer_id: &str) -> String {
    format!("{prefix}{customer_id}")
}

/// Parses a stored snapshot. A value that no longer parses is reported as
/// a validation error so that it is never retried.
pub(crate) fn decode_state(
    raw: &str,
    requirement: DocumentRequirement,
) -> Result<JourneyState, DomainError> {
    let snapshot: JourneySnapshot = serde_json::from_str(raw)
        .map_err(|e| DomainError::Validation(format!("corrupt journey state: {e}")))?;
    JourneyState::rehydrate(snapshot, requirement)
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn get(&self, customer_id: &str) -> Result<Option<JourneyState>, DomainError> {
        let mut conn = self.connection_manager.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.key(customer_id))
            .query_async(&mut conn)
            .await
            .map_err(redis_error("GET"))?;

        raw.map(|raw| decode_state(&raw, self.requirement))
            .transpose()
    }

    async fn save(&self, state: &JourneyState) -> Result<(), DomainError> {
        let mut conn = self.connection_manager.clone();
        let payload = serde_json::to_string(&state.snapshot())
            .map_err(|e| DomainError::Unknown(format!("state serialization failed: {e}")))?;

        redis::cmd("SETEX")
            .arg(self.key(state.customer_id()))
            .arg(ttl_seconds(self.ttl))
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await
            .map_err(redis_error("SETEX"))?;

        debug!(
            customer_id = state.customer_id(),
            step = %state.current_step(),
            "journey state saved"
        );
        Ok(())
    }

    async fn delete(&self, customer_id: &str) -> Result<(), DomainError> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("DEL")
            .arg(self.key(customer_id))
            .query_async::<()>(&mut conn)
            .await
            .map_err(redis_error("DEL"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use journey_card_application::domain::state::JourneyStep;

    use super::*;

    fn snapshot(document_count: u32) -> JourneySnapshot {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        JourneySnapshot {
            customer_id: "C1".to_owned(),
            current_step: JourneyStep::DocumentPending,
            document_count,
            started_at: t0,
            updated_at: t0,
            metadata: BTreeMap::from([("segment".to_owned(), "VIP".to_owned())]),
            applied_event_ids: vec!["E1".to_owned(), "E2".to_owned()],
        }
    }

    #[test]
    fn test_state_key_prepends_prefix() {
        assert_eq!(state_key(DEFAULT_STATE_PREFIX, "C1"), "journey:state:C1");
    }

    #[test]
    fn test_decode_state_restores_snapshot() {
        let raw = serde_json::to_string(&snapshot(1)).unwrap();

        let state = decode_state(&raw, DocumentRequirement::default()).unwrap();

        assert_eq!(state.snapshot(), snapshot(1));
    }

    #[test]
    fn test_decode_state_accepts_snapshot_without_event_ids() {
        let raw = r#"{"customer_id":"C1","current_step":"APPLIED","document_count":0,
            "started_at":"2026-01-15T10:00:00Z","updated_at":"2026-01-15T10:00:00Z"}"#;

        let state = decode_state(raw, DocumentRequirement::default()).unwrap();

        assert_eq!(state.current_step(), JourneyStep::Applied);
        assert_eq!(state.last_event_id(), None);
    }

    #[test]
    fn test_decode_state_rejects_garbage_as_validation_error() {
        let result = decode_state("not json", DocumentRequirement::default());

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_decode_state_rejects_document_count_above_requirement() {
        let raw = serde_json::to_string(&snapshot(3)).unwrap();

        let result = decode_state(&raw, DocumentRequirement::default());

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
