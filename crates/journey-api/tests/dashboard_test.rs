//! Integration tests for the dashboard endpoints.

mod common;

use std::collections::BTreeMap;

use axum::http::StatusCode;
use chrono::TimeDelta;
use common::{TestApp, t0};
use journey_card_application::application::ports::{ActionAuditSink, EventStore};
use journey_card_application::domain::action::Action;
use journey_card_application::domain::events::{CustomerEvent, EventType};
use journey_card_application::domain::state::JourneyStep;

fn event_at(id: &str, customer_id: &str, event_type: EventType, minutes: i64) -> CustomerEvent {
    CustomerEvent::new(
        id,
        customer_id,
        event_type,
        t0() + TimeDelta::minutes(minutes),
        BTreeMap::new(),
    )
    .unwrap()
}

fn action_at(customer_id: &str, event_id: &str, minutes: i64) -> Action {
    Action {
        action_id: Action::derive_id(customer_id, event_id, JourneyStep::Applied),
        customer_id: customer_id.to_owned(),
        action_type: "PUSH_NOTIFICATION".to_owned(),
        message: format!("message for {event_id}"),
        channel: "MOBILE_APP".to_owned(),
        campaign_id: Some("campaign-card-onboarding".to_owned()),
        created_at: t0() + TimeDelta::minutes(minutes),
    }
}

async fn seeded() -> TestApp {
    let app = TestApp::new();
    for (id, customer, event_type, minutes) in [
        ("E1", "C1", EventType::CardApply, 0),
        ("E2", "C1", EventType::DocumentUpload, 1),
        ("E3", "C1", EventType::DocumentUpload, 2),
        ("E4", "C2", EventType::CardApply, 3),
    ] {
        app.events
            .save(&event_at(id, customer, event_type, minutes))
            .await
            .unwrap();
    }
    for (customer, event_id, minutes) in [("C1", "E1", 0), ("C1", "E2", 1), ("C2", "E4", 3)] {
        app.audit
            .record(&action_at(customer, event_id, minutes))
            .await
            .unwrap();
    }
    app
}

#[tokio::test]
async fn test_stats_report_totals_distribution_and_recent_actions() {
    // Arrange
    let app = seeded().await;

    // Act
    let (status, json) = common::get_json(app.router(), "/dashboard/stats").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_events"], 4);
    assert_eq!(json["total_actions"], 3);
    assert_eq!(json["recent_actions_limit"], 10);

    let distribution = json["events_by_type"].as_array().unwrap();
    assert_eq!(distribution.len(), 2);
    let counted: u64 = distribution
        .iter()
        .map(|d| d["count"].as_u64().unwrap())
        .sum();
    assert_eq!(counted, 4);

    let recent = json["recent_actions"].as_array().unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0]["customer_id"], "C2");
    assert_eq!(recent[0]["message"], "message for E4");
}

#[tokio::test]
async fn test_stats_recent_limit_is_applied_and_clamped() {
    // Arrange
    let app = seeded().await;

    // Act
    let (_, limited) = common::get_json(app.router(), "/dashboard/stats?recentLimit=1").await;
    let (_, clamped) = common::get_json(app.router(), "/dashboard/stats?recentLimit=0").await;
    let (_, capped) = common::get_json(app.router(), "/dashboard/stats?recentLimit=5000").await;

    // Assert
    assert_eq!(limited["recent_actions"].as_array().unwrap().len(), 1);
    assert_eq!(clamped["recent_actions_limit"], 1);
    assert_eq!(capped["recent_actions_limit"], 100);
}

#[tokio::test]
async fn test_stats_fail_with_500_when_event_store_is_down() {
    // Arrange
    let app = seeded().await;
    app.events.set_offline(true);

    // Act
    let (status, json) = common::get_json(app.router(), "/dashboard/stats").await;

    // Assert
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "infrastructure_error");
}

#[tokio::test]
async fn test_customer_events_are_newest_first_and_limited() {
    // Arrange
    let app = seeded().await;

    // Act
    let (status, json) =
        common::get_json(app.router(), "/dashboard/customers/C1/events?limit=2").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["customer_id"], "C1");
    let events = json["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event_id"], "E3");
    assert_eq!(events[0]["event_type"], "DOCUMENT_UPLOAD");
    assert_eq!(events[1]["event_id"], "E2");
}

#[tokio::test]
async fn test_customer_events_for_unknown_customer_are_empty() {
    let app = seeded().await;

    let (status, json) = common::get_json(app.router(), "/dashboard/customers/C9/events").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["events"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_customer_id_is_rejected() {
    let app = seeded().await;

    let (status, json) = common::get_json(app.router(), "/dashboard/customers/%20/events").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}
