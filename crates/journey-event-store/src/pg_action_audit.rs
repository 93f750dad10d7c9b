//! `PostgreSQL` implementation of the `ActionAuditSink` port.

use async_trait::async_trait;
use journey_card_application::application::ports::ActionAuditSink;
use journey_card_application::domain::action::Action;
use journey_core::error::DomainError;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

use crate::schema;
use crate::{database_error, to_count};

/// PostgreSQL-backed action audit. `created_at` of an action is stored as
/// `sent_at`.
#[derive(Debug, Clone)]
pub struct PgActionAudit {
    pool: PgPool,
}

impl PgActionAudit {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn action_from_row(row: &PgRow) -> Result<Action, sqlx::Error> {
        Ok(Action {
            action_id: row.try_get("action_id")?,
            customer_id: row.try_get("customer_id")?,
            action_type: row.try_get("action_type")?,
            message: row.try_get("message")?,
            channel: row.try_get("channel")?,
            campaign_id: row.try_get("campaign_id")?,
            created_at: row.try_get("sent_at")?,
        })
    }
}

#[async_trait]
impl ActionAuditSink for PgActionAudit {
    #[instrument(skip(self, action), fields(action_id = %action.action_id))]
    async fn record(&self, action: &Action) -> Result<bool, DomainError> {
        let result = sqlx::query(schema::INSERT_ACTION)
            .bind(action.action_id)
            .bind(&action.customer_id)
            .bind(&action.action_type)
            .bind(&action.message)
            .bind(&action.channel)
            .bind(action.campaign_id.as_deref())
            .bind(action.created_at)
            .execute(&self.pool)
            .await
            .map_err(database_error("failed to insert action"))?;

        let inserted = result.rows_affected() > 0;
        if !inserted {
            debug!("action already recorded");
        }
        Ok(inserted)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Action>, DomainError> {
        let rows = sqlx::query(schema::SELECT_RECENT_ACTIONS)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(database_error("failed to fetch recent actions"))?;

        rows.iter()
            .map(|row| Self::action_from_row(row).map_err(database_error("corrupt action row")))
            .collect()
    }

    async fn count_all(&self) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar(schema::COUNT_ACTIONS)
            .fetch_one(&self.pool)
            .await
            .map_err(database_error("failed to count actions"))?;
        Ok(to_count(count))
    }
}
