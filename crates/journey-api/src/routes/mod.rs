//! Route modules.

pub mod dashboard;
pub mod health;
pub mod test_events;

use axum::Router;

use crate::state::AppState;

/// Builds the full router over `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/dashboard", dashboard::router())
        .nest("/api/test", test_events::router())
        .with_state(state)
}
