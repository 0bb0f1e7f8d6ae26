use std::sync::Arc;

use super::common::*;
use chrono::NaiveDate;

use crate::domain::{ApplicationStatus, Milestone};
use crate::lifecycle::TransitionError;
use crate::store::{CrmStore, Repository};
use crate::workflows::{MilestoneUpdate, TransitionRequest, WorkflowError};

fn to(status: ApplicationStatus) -> TransitionRequest {
    TransitionRequest { status, note: None }
}

#[test]
fn submission_requires_documents_milestone() {
    let (service, store) = build_service(ScriptedReasoner::failing());

    let error = service
        .transition_application("app-5", to(ApplicationStatus::Submitted))
        .expect_err("guarded");
    assert!(matches!(
        error,
        WorkflowError::Transition(TransitionError::GuardFailed { .. })
    ));
    assert_eq!(error.status(), axum::http::StatusCode::CONFLICT);
    assert_eq!(
        store.applications.require("app-5").expect("stored").status,
        ApplicationStatus::Draft
    );

    service
        .complete_milestone(
            "app-5",
            MilestoneUpdate {
                milestone: Milestone::DocumentsSubmitted,
                date: NaiveDate::from_ymd_opt(2025, 4, 10),
                notes: Some("Transcripts and passport".to_string()),
            },
        )
        .expect("milestone recorded");

    let moved = service
        .transition_application("app-5", to(ApplicationStatus::Submitted))
        .expect("submitted");

    assert_eq!(moved.previous_status, ApplicationStatus::Draft);
    assert_eq!(moved.application.status, ApplicationStatus::Submitted);
    assert!(moved
        .application
        .milestone_completed(Milestone::ApplicationSubmitted));
    let documents = &moved.application.milestones[&Milestone::DocumentsSubmitted];
    assert_eq!(documents.date, NaiveDate::from_ymd_opt(2025, 4, 10));

    let notifications = store.notifications.list(10).expect("notifications");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].recipient_id, "stu-3");
    assert!(notifications[0].message.contains("draft to submitted"));
    assert!(moved.notification_error.is_none());
}

#[test]
fn terminal_application_cannot_move() {
    let (service, store) = build_service(ScriptedReasoner::failing());

    let error = service
        .transition_application("app-1", to(ApplicationStatus::Draft))
        .expect_err("illegal");

    assert_eq!(
        error.to_string(),
        "illegal transition from enrolled to draft"
    );
    assert!(store.notifications.list(10).expect("notifications").is_empty());
}

#[test]
fn terminal_application_rejects_milestones() {
    let (service, _) = build_service(ScriptedReasoner::failing());

    let error = service
        .complete_milestone(
            "app-3",
            MilestoneUpdate {
                milestone: Milestone::VisaApplied,
                date: None,
                notes: None,
            },
        )
        .expect_err("terminal");

    assert!(matches!(error, WorkflowError::InvalidInput(_)));
}

#[test]
fn unknown_application_is_not_found() {
    let (service, _) = build_service(ScriptedReasoner::failing());

    let error = service
        .transition_application("app-404", to(ApplicationStatus::Withdrawn))
        .expect_err("missing");

    assert!(matches!(
        error,
        WorkflowError::NotFound {
            kind: "application",
            ..
        }
    ));
}

#[test]
fn transition_stands_when_the_student_notification_fails() {
    let store = CrmStore {
        notifications: Arc::new(FlakyNotifications::failing_for("stu-3")),
        ..seeded_store()
    };
    let (service, store) = service_with_store(store, ScriptedReasoner::failing());

    let moved = service
        .transition_application("app-4", to(ApplicationStatus::UnderReview))
        .expect("transition saved");

    assert_eq!(moved.previous_status, ApplicationStatus::Submitted);
    assert_eq!(moved.notification_error.as_deref(), Some("store_unavailable"));
    assert_eq!(
        store.applications.require("app-4").expect("stored").status,
        ApplicationStatus::UnderReview
    );
    assert!(store.notifications.list(10).expect("notifications").is_empty());
}
