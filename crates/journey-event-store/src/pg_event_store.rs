//! `PostgreSQL` implementation of the `EventStore` port.

use std::collections::BTreeMap;

use async_trait::async_trait;
use journey_card_application::application::ports::{EventStore, EventTypeCount};
use journey_card_application::domain::events::{CustomerEvent, EventType};
use journey_core::error::DomainError;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

use crate::schema;
use crate::{database_error, to_count};

/// PostgreSQL-backed event audit.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn event_from_row(row: &PgRow) -> Result<CustomerEvent, DomainError> {
        let corrupt =
            |e: sqlx::Error| DomainError::Infrastructure(format!("corrupt event row: {e}"));
        let event_type: String = row.try_get("event_type").map_err(corrupt)?;
        let event_type: EventType = event_type.parse().map_err(|e: DomainError| {
            DomainError::Infrastructure(format!("corrupt event row: {e}"))
        })?;
        let Json(metadata): Json<BTreeMap<String, String>> =
            row.try_get("payload").map_err(corrupt)?;

        CustomerEvent::new(
            row.try_get::<String, _>("event_id").map_err(corrupt)?,
            row.try_get::<String, _>("customer_id").map_err(corrupt)?,
            event_type,
            row.try_get("timestamp").map_err(corrupt)?,
            metadata,
        )
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self, event), fields(event_id = %event.event_id()))]
    async fn save(&self, event: &CustomerEvent) -> Result<bool, DomainError> {
        let result = sqlx::query(schema::INSERT_EVENT)
            .bind(event.event_id())
            .bind(event.customer_id())
            .bind(event.event_type().as_str())
            .bind(event.timestamp())
            .bind(Json(event.metadata()))
            .execute(&self.pool)
            .await
            .map_err(database_error("failed to insert event"))?;

        let inserted = result.rows_affected() > 0;
        if !inserted {
            debug!("event already recorded");
        }
        Ok(inserted)
    }

    async fn find_by_customer(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        let rows = sqlx::query(schema::SELECT_EVENTS_BY_CUSTOMER)
            .bind(customer_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(database_error("failed to fetch customer events"))?;

        rows.iter().map(Self::event_from_row).collect()
    }

    async fn count_all(&self) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar(schema::COUNT_EVENTS)
            .fetch_one(&self.pool)
            .await
            .map_err(database_error("failed to count events"))?;
        Ok(to_count(count))
    }

    async fn count_by_type(&self) -> Result<Vec<EventTypeCount>, DomainError> {
        let rows = sqlx::query(schema::COUNT_EVENTS_BY_TYPE)
            .fetch_all(&self.pool)
            .await
            .map_err(database_error("failed to count events by type"))?;

        rows.iter()
            .map(|row| {
                Ok(EventTypeCount {
                    event_type: row
                        .try_get("event_type")
                        .map_err(database_error("corrupt event count row"))?,
                    count: to_count(
                        row.try_get("cnt")
                            .map_err(database_error("corrupt event count row"))?,
                    ),
                })
            })
            .collect()
    }
}
