//! Dashboard endpoints over the audit stores.

use axum::extract::{Path, Query, State};
use axum::{Json, Router, routing::get};
use journey_card_application::application::query_handlers::{
    self, DashboardStats, clamp_limit,
};
use journey_ingest::payload::EventPayload;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Events returned by the history endpoint when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Query parameters of `GET /dashboard/stats`.
#[derive(Debug, Deserialize)]
pub struct StatsParams {
    #[serde(rename = "recentLimit")]
    pub recent_limit: Option<u32>,
}

/// Query parameters of `GET /dashboard/customers/{customer_id}/events`.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<u32>,
}

/// Dashboard statistics plus the recent-actions limit that was applied.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub recent_actions_limit: u32,
}

/// Audited events of one customer, newest first.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub customer_id: String,
    pub events: Vec<EventPayload>,
}

/// GET /dashboard/stats
async fn stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<StatsResponse>, ApiError> {
    let limit = clamp_limit(params.recent_limit, state.settings.dashboard_recent_limit);
    let stats = query_handlers::get_dashboard_stats(
        state.event_store.as_ref(),
        state.action_audit.as_ref(),
        limit,
    )
    .await?;
    Ok(Json(StatsResponse {
        stats,
        recent_actions_limit: limit,
    }))
}

/// GET /dashboard/customers/{customer_id}/events
async fn customer_events(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = clamp_limit(params.limit, DEFAULT_HISTORY_LIMIT);
    let events =
        query_handlers::get_customer_history(&customer_id, limit, state.event_store.as_ref())
            .await?;
    Ok(Json(HistoryResponse {
        customer_id,
        events: events.iter().map(EventPayload::from_event).collect(),
    }))
}

/// Returns the router for the dashboard.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/customers/{customer_id}/events", get(customer_events))
}
