use super::common::*;
use serde_json::json;

use crate::store::Repository;
use crate::workflows::onboarding::ONBOARDING_BADGE;
use crate::workflows::quiz::QUIZ_BADGE;
use crate::workflows::{OnboardingSubmission, QuizAnswer, QuizSubmission, WorkflowError};

fn submission(quiz_id: &str) -> QuizSubmission {
    QuizSubmission {
        quiz_id: quiz_id.to_string(),
        topic: Some("Visa basics".to_string()),
        answers: vec![QuizAnswer {
            question: "Which document proves enrolment?".to_string(),
            answer: "The confirmation of enrolment letter".to_string(),
            expected: Some("CoE".to_string()),
        }],
    }
}

fn graded(score: f64) -> serde_json::Value {
    json!({ "score": score, "feedback": "Review the visa checklist." })
}

fn module(module_id: &str) -> OnboardingSubmission {
    OnboardingSubmission {
        module_id: module_id.to_string(),
        module_title: None,
        responses: vec!["I would check the offer conditions first.".to_string()],
    }
}

#[tokio::test]
async fn quiz_at_threshold_passes_and_awards_badge() {
    let (service, store) = build_service(ScriptedReasoner::replying(graded(70.0)));

    let outcome = service
        .grade_quiz("cns-1", submission("visa-101"))
        .await
        .expect("graded");

    assert!(outcome.attempt.passed);
    let badge = outcome.badge.expect("badge awarded");
    assert_eq!(badge.badge_type, QUIZ_BADGE);
    assert_eq!(badge.holder_id, "cns-1");
    assert!(outcome.notification.is_some());
    assert_eq!(store.quiz_attempts.list(10).expect("attempts").len(), 1);
}

#[tokio::test]
async fn quiz_just_below_threshold_fails_without_side_effects() {
    let (service, store) = build_service(ScriptedReasoner::replying(graded(69.99)));

    let outcome = service
        .grade_quiz("cns-1", submission("visa-101"))
        .await
        .expect("graded");

    assert!(!outcome.attempt.passed);
    assert!(outcome.badge.is_none());
    assert!(outcome.notification.is_none());
    assert!(store.badges.list(10).expect("badges").is_empty());
    assert!(store.notifications.list(10).expect("notifications").is_empty());
}

#[tokio::test]
async fn passing_twice_keeps_a_single_badge() {
    let (service, store) = build_service(ScriptedReasoner::replying(graded(91.0)));

    let first = service
        .grade_quiz("cns-1", submission("visa-101"))
        .await
        .expect("first attempt");
    let second = service
        .grade_quiz("cns-1", submission("visa-102"))
        .await
        .expect("second attempt");

    assert!(first.badge.is_some());
    assert!(second.badge.is_none());
    assert!(second.attempt.passed);
    assert_eq!(store.badges.list(10).expect("badges").len(), 1);
    assert_eq!(store.quiz_attempts.list(10).expect("attempts").len(), 2);
}

#[tokio::test]
async fn empty_quiz_is_rejected_before_grading() {
    let reasoner = ScriptedReasoner::replying(graded(100.0));
    let (service, _) = build_service(reasoner.clone());
    let mut empty = submission("visa-101");
    empty.answers.clear();

    let error = service.grade_quiz("cns-1", empty).await.expect_err("invalid");

    assert!(matches!(error, WorkflowError::InvalidInput(_)));
    assert_eq!(reasoner.calls(), 0);
}

#[tokio::test]
async fn onboarding_completes_after_required_modules() {
    let (service, store) = build_service(ScriptedReasoner::replying(graded(82.0)));

    let first = service
        .evaluate_onboarding("cns-2", module("crm-basics"))
        .await
        .expect("module one");
    assert!(first.module_passed);
    assert!(!first.progress.completed);
    assert!(first.badge.is_none());

    let repeat = service
        .evaluate_onboarding("cns-2", module("crm-basics"))
        .await
        .expect("module one again");
    assert_eq!(repeat.progress.completed_modules.len(), 1);

    service
        .evaluate_onboarding("cns-2", module("visa-process"))
        .await
        .expect("module two");
    let last = service
        .evaluate_onboarding("cns-2", module("scholarships"))
        .await
        .expect("module three");

    assert!(last.progress.completed);
    assert_eq!(last.progress.completed_modules.len(), 3);
    assert_eq!(
        last.badge.expect("onboarding badge").badge_type,
        ONBOARDING_BADGE
    );
    assert_eq!(store.onboarding.list(10).expect("progress").len(), 1);
    let notifications = store.notifications.list(10).expect("notifications");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, "onboarding");
}

#[tokio::test]
async fn failed_module_is_scored_but_not_completed() {
    let (service, _) = build_service(ScriptedReasoner::replying(graded(55.0)));

    let outcome = service
        .evaluate_onboarding("cns-2", module("crm-basics"))
        .await
        .expect("evaluated");

    assert!(!outcome.module_passed);
    assert!(outcome.progress.completed_modules.is_empty());
    assert_eq!(outcome.progress.module_scores["crm-basics"], 55.0);
}

#[test]
fn concurrent_passes_award_a_single_badge() {
    let (service, store) = build_service(ScriptedReasoner::failing());

    let awarded: Vec<bool> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    service
                        .award_badge("cns-1", QUIZ_BADGE, "Quiz passed")
                        .expect("badge write")
                        .is_some()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("award thread"))
            .collect()
    });

    assert_eq!(awarded.iter().filter(|awarded| **awarded).count(), 1);
    assert_eq!(store.badges.list(10).expect("badges").len(), 1);
}
