//! Integration tests for the journey orchestrator.

mod common;

use std::sync::Arc;

use chrono::TimeDelta;
use common::{Harness, event, event_with_segment, t0};
use journey_card_application::application::decision_engine::DecisionEngine;
use journey_card_application::application::orchestrator::{
    AppliedTransition, NotificationStatus, Orchestrator, ProcessingOutcome,
};
use journey_card_application::domain::action::Action;
use journey_card_application::domain::events::EventType;
use journey_card_application::domain::state::JourneyStep;
use journey_core::error::DomainError;
use journey_test_support::{
    FailingActionPublisher, FailingEventStore, FailingStateStore, FixedClock,
    InMemoryEventStore, InMemoryStateStore, ManualClock, RecordingActionPublisher,
};

fn success(outcome: ProcessingOutcome) -> AppliedTransition {
    match outcome {
        ProcessingOutcome::Success(transition) => transition,
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_card_application_starts_journey_and_notifies() {
    // Arrange
    let harness = Harness::new();
    let apply = event("E1", "C1-ABCDEFGHIJ", EventType::CardApply);

    // Act
    let outcome = harness.orchestrator.process(&apply).await.unwrap();

    // Assert
    let transition = success(outcome);
    assert_eq!(transition.previous_step, None);
    assert_eq!(transition.new_step, JourneyStep::Applied);
    assert_eq!(transition.notification, NotificationStatus::Published);

    let state = harness.states.state_of("C1-ABCDEFGHIJ").unwrap();
    assert_eq!(state.current_step(), JourneyStep::Applied);
    assert_eq!(state.document_count(), 0);

    let sent = harness.sent_actions();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0]["message"],
        "Başvurunuz alındı! Tracking ID: C1-ABCDE"
    );
    assert_eq!(sent[0]["action_type"], "PUSH_NOTIFICATION");
    assert_eq!(sent[0]["channel"], "MOBILE_APP");
    assert_eq!(sent[0]["campaign_id"], "campaign-card-onboarding");
    assert_eq!(harness.audit.actions().len(), 1);
    assert_eq!(harness.events.events().len(), 1);
}

#[tokio::test]
async fn test_full_happy_path_reaches_approved_with_vip_message() {
    // Arrange
    let harness = Harness::new();
    let customer = "C2-VIPCUSTOMER";
    let sequence = [
        ("E1", EventType::CardApply, JourneyStep::Applied),
        (
            "E2",
            EventType::DocumentUpload,
            JourneyStep::DocumentPending,
        ),
        ("E3", EventType::DocumentUpload, JourneyStep::UnderReview),
        ("E4", EventType::Approval, JourneyStep::Approved),
    ];

    // Act / Assert
    for (id, event_type, expected) in sequence {
        let outcome = harness
            .orchestrator
            .process(&event_with_segment(id, customer, event_type, "VIP"))
            .await
            .unwrap();
        assert_eq!(success(outcome).new_step, expected, "after {id}");
    }

    let state = harness.states.state_of(customer).unwrap();
    assert_eq!(state.current_step(), JourneyStep::Approved);
    assert_eq!(state.document_count(), 2);

    let sent = harness.sent_actions();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[1]["message"], "Lütfen 1 adet belge yükleyin.");
    let approval = sent[3]["message"].as_str().unwrap();
    assert!(approval.starts_with("🎉 Tebrikler!"));
    assert!(approval.contains("VIP müşterimizsiniz"));
}

#[tokio::test]
async fn test_rejection_from_review_is_terminal() {
    // Arrange
    let harness = Harness::new();
    for (id, event_type) in [
        ("E1", EventType::CardApply),
        ("E2", EventType::DocumentUpload),
        ("E3", EventType::DocumentUpload),
        ("E4", EventType::Rejection),
    ] {
        harness
            .orchestrator
            .process(&event(id, "C3", event_type))
            .await
            .unwrap();
    }

    // Act
    let late_approval = harness
        .orchestrator
        .process(&event("E5", "C3", EventType::Approval))
        .await
        .unwrap();

    // Assert
    assert_eq!(late_approval, ProcessingOutcome::SkippedInvalidTransition);
    assert_eq!(
        harness.states.state_of("C3").unwrap().current_step(),
        JourneyStep::Rejected
    );
    assert_eq!(harness.sent_actions().len(), 4);
    assert_eq!(harness.events.events().len(), 5);
}

#[tokio::test]
async fn test_out_of_order_event_is_audited_but_skipped() {
    // Arrange
    let harness = Harness::new();
    let upload = event("E1", "C4", EventType::DocumentUpload);

    // Act
    let outcome = harness.orchestrator.process(&upload).await.unwrap();

    // Assert
    assert_eq!(outcome, ProcessingOutcome::SkippedInvalidTransition);
    assert!(harness.states.state_of("C4").is_none());
    assert!(harness.sent_actions().is_empty());
    assert_eq!(harness.events.events().len(), 1);
}

#[tokio::test]
async fn test_redelivered_event_is_not_applied_twice() {
    // Arrange
    let harness = Harness::new();
    harness
        .orchestrator
        .process(&event("E1", "C5", EventType::CardApply))
        .await
        .unwrap();
    let first_upload = event("E2", "C5", EventType::DocumentUpload);
    harness.orchestrator.process(&first_upload).await.unwrap();
    let second_upload = event("E3", "C5", EventType::DocumentUpload);
    harness.orchestrator.process(&second_upload).await.unwrap();

    // Act
    let stale_replay = harness.orchestrator.process(&first_upload).await.unwrap();
    let latest_replay = harness.orchestrator.process(&second_upload).await.unwrap();

    // Assert
    assert_eq!(stale_replay, ProcessingOutcome::SkippedDuplicate);
    assert_eq!(latest_replay, ProcessingOutcome::SkippedDuplicate);
    let state = harness.states.state_of("C5").unwrap();
    assert_eq!(state.current_step(), JourneyStep::UnderReview);
    assert_eq!(state.document_count(), 2);
    assert_eq!(harness.sent_actions().len(), 3);
    assert_eq!(harness.audit.actions().len(), 3);
    assert_eq!(harness.events.events().len(), 3);
}

#[tokio::test]
async fn test_replay_of_latest_event_recovers_lost_notification() {
    // Arrange
    let harness = Harness::new();
    let apply = event("E1", "C6", EventType::CardApply);
    harness.producer.set_failing(true);
    let first = success(harness.orchestrator.process(&apply).await.unwrap());
    assert!(matches!(first.notification, NotificationStatus::Failed(_)));
    harness.producer.set_failing(false);

    // Act
    let replay = harness.orchestrator.process(&apply).await.unwrap();

    // Assert
    assert_eq!(replay, ProcessingOutcome::SkippedDuplicate);
    let sent = harness.sent_actions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["action_id"], first.action_id.to_string());
}

#[tokio::test]
async fn test_publish_failure_keeps_state_change() {
    // Arrange
    let events = Arc::new(InMemoryEventStore::new());
    let states = Arc::new(InMemoryStateStore::new());
    let orchestrator = Orchestrator::new(
        events,
        states.clone(),
        DecisionEngine::default(),
        Arc::new(FailingActionPublisher),
        Arc::new(FixedClock(t0())),
    );

    // Act
    let outcome = orchestrator
        .process(&event("E1", "C7", EventType::CardApply))
        .await
        .unwrap();

    // Assert
    let transition = success(outcome);
    assert!(matches!(transition.notification, NotificationStatus::Failed(_)));
    assert_eq!(
        states.state_of("C7").unwrap().current_step(),
        JourneyStep::Applied
    );
}

#[tokio::test]
async fn test_state_store_outage_is_retryable_and_changes_nothing() {
    // Arrange
    let publisher = Arc::new(RecordingActionPublisher::new());
    let orchestrator = Orchestrator::new(
        Arc::new(InMemoryEventStore::new()),
        Arc::new(FailingStateStore),
        DecisionEngine::default(),
        publisher.clone(),
        Arc::new(FixedClock(t0())),
    );

    // Act
    let result = orchestrator
        .process(&event("E1", "C8", EventType::CardApply))
        .await;

    // Assert
    let error = result.unwrap_err();
    assert!(matches!(error, DomainError::Infrastructure(_)));
    assert!(error.is_retryable());
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn test_event_store_outage_stops_before_state_is_touched() {
    // Arrange
    let states = Arc::new(InMemoryStateStore::new());
    let publisher = Arc::new(RecordingActionPublisher::new());
    let orchestrator = Orchestrator::new(
        Arc::new(FailingEventStore),
        states.clone(),
        DecisionEngine::default(),
        publisher.clone(),
        Arc::new(FixedClock(t0())),
    );

    // Act
    let result = orchestrator
        .process(&event("E1", "C9", EventType::CardApply))
        .await;

    // Assert
    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    assert!(states.state_of("C9").is_none());
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn test_action_id_is_derived_from_triggering_event() {
    // Arrange
    let harness = Harness::new();

    // Act
    let transition = success(
        harness
            .orchestrator
            .process(&event("E1", "C10", EventType::CardApply))
            .await
            .unwrap(),
    );

    // Assert
    assert_eq!(
        transition.action_id,
        Action::derive_id("C10", "E1", JourneyStep::Applied)
    );
}

#[tokio::test]
async fn test_unknown_segment_falls_back_to_regular() {
    // Arrange
    let harness = Harness::new();
    let customer = "C11";
    for (id, event_type) in [
        ("E1", EventType::CardApply),
        ("E2", EventType::DocumentUpload),
        ("E3", EventType::DocumentUpload),
    ] {
        harness
            .orchestrator
            .process(&event_with_segment(id, customer, event_type, "PLATINUM"))
            .await
            .unwrap();
    }

    // Act
    harness
        .orchestrator
        .process(&event_with_segment(
            "E4",
            customer,
            EventType::Approval,
            "PLATINUM",
        ))
        .await
        .unwrap();

    // Assert
    let sent = harness.sent_actions();
    let approval = sent.last().unwrap()["message"].as_str().unwrap().to_owned();
    assert!(!approval.contains("VIP"));
}

#[tokio::test]
async fn test_transitions_stamp_updated_at_and_action_time() {
    // Arrange
    let clock = Arc::new(ManualClock::starting_at(t0()));
    let states = Arc::new(InMemoryStateStore::new());
    let publisher = Arc::new(RecordingActionPublisher::new());
    let orchestrator = Orchestrator::new(
        Arc::new(InMemoryEventStore::new()),
        states.clone(),
        DecisionEngine::default(),
        publisher.clone(),
        clock.clone(),
    );
    orchestrator
        .process(&event("E1", "C12", EventType::CardApply))
        .await
        .unwrap();

    // Act
    clock.advance(TimeDelta::minutes(5));
    orchestrator
        .process(&event("E2", "C12", EventType::DocumentUpload))
        .await
        .unwrap();

    // Assert
    let state = states.state_of("C12").unwrap();
    assert_eq!(state.started_at(), t0());
    assert_eq!(state.updated_at(), t0() + TimeDelta::minutes(5));
    let published = publisher.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].created_at, t0());
    assert_eq!(published[1].created_at, t0() + TimeDelta::minutes(5));
}
