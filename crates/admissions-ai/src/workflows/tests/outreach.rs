use std::sync::Arc;

use super::common::*;
use serde_json::json;

use crate::domain::{OutreachStatus, TaskPriority};
use crate::reasoning::ReasoningError;
use crate::store::{CrmStore, Repository};
use crate::workflows::{OutreachRequest, ResponseLog, ResponseOutcome, WorkflowError};

fn draft_reasoner() -> Arc<ScriptedReasoner> {
    ScriptedReasoner::new(|request| {
        if request.prompt.contains("Alpine Institute") {
            return Ok(json!({ "subject": "Partnership" }));
        }
        if request.prompt.contains("Southern Cross") {
            return Err(ReasoningError::Api {
                status: 503,
                message: "upstream overloaded".to_string(),
            });
        }
        Ok(json!({
            "subject": "Postgraduate intake enquiry",
            "body": "Dear admissions team, ..."
        }))
    })
}

fn request(university_ids: &[&str]) -> OutreachRequest {
    OutreachRequest {
        campaign_name: "Autumn intake".to_string(),
        university_ids: university_ids.iter().map(|id| id.to_string()).collect(),
        student_id: Some("stu-1".to_string()),
        purpose: "Ask about September places for master's students".to_string(),
        tone: None,
    }
}

#[tokio::test]
async fn one_failed_draft_does_not_sink_the_campaign() {
    let (service, store) = build_service(draft_reasoner());

    let outcome = service
        .generate_outreach("cns-1", request(&["uni-1", "uni-2", "uni-3", "uni-404"]))
        .await
        .expect("campaign");

    assert_eq!(outcome.drafted, 1);
    assert_eq!(outcome.failed, 3);
    assert_eq!(outcome.results.len(), 4);
    assert!(outcome.results[0].outreach_id.is_some());
    assert_eq!(outcome.results[1].error.as_deref(), Some("reasoning_failed"));
    assert_eq!(
        outcome.results[2].error.as_deref(),
        Some("reasoning_invalid_output")
    );
    assert_eq!(
        outcome.results[3].error.as_deref(),
        Some("university uni-404 not found")
    );

    assert_eq!(outcome.campaign.outreach_ids.len(), 1);
    assert_eq!(outcome.campaign.university_ids.len(), 4);
    let stored = store.outreach.list(10).expect("outreach");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, OutreachStatus::Draft);
    assert_eq!(stored[0].student_id.as_deref(), Some("stu-1"));
    assert_eq!(
        stored[0].campaign_id.as_deref(),
        Some(outcome.campaign.id.as_str())
    );
}

#[tokio::test]
async fn duplicate_and_blank_university_ids_are_collapsed() {
    let reasoner = draft_reasoner();
    let (service, _) = build_service(reasoner.clone());

    let outcome = service
        .generate_outreach("cns-1", request(&["uni-1", " uni-1 ", ""]))
        .await
        .expect("campaign");

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(reasoner.calls(), 1);
}

#[tokio::test]
async fn campaign_needs_a_university() {
    let (service, _) = build_service(draft_reasoner());

    let error = service
        .generate_outreach("cns-1", request(&[]))
        .await
        .expect_err("invalid");

    assert!(matches!(error, WorkflowError::InvalidInput(_)));
}

#[tokio::test]
async fn follow_up_response_opens_a_task() {
    let (service, store) = build_service(draft_reasoner());
    let outcome = service
        .generate_outreach("cns-1", request(&["uni-1"]))
        .await
        .expect("campaign");
    let outreach_id = outcome.results[0].outreach_id.clone().expect("drafted");

    let sent = service.mark_outreach_sent(&outreach_id).expect("sent");
    assert_eq!(sent.status, OutreachStatus::Sent);
    assert!(sent.sent_at.is_some());

    let logged = service
        .record_outreach_response(
            &outreach_id,
            ResponseLog {
                outcome: ResponseOutcome::FollowUpNeeded,
                summary: Some("Asked for transcripts".to_string()),
            },
        )
        .expect("response logged");

    assert_eq!(logged.outreach.status, OutreachStatus::FollowUpNeeded);
    assert!(logged.outreach.responded_at.is_some());
    let task = logged.follow_up_task.expect("follow-up task");
    assert_eq!(task.assignee_id, "cns-1");
    assert_eq!(task.priority, TaskPriority::Medium);
    assert_eq!(task.description, "Asked for transcripts");
    assert_eq!(task.related_id.as_deref(), Some(outreach_id.as_str()));
    assert_eq!(store.tasks.list(10).expect("tasks").len(), 1);
}

#[tokio::test]
async fn draft_cannot_record_a_response() {
    let (service, store) = build_service(draft_reasoner());
    let outcome = service
        .generate_outreach("cns-1", request(&["uni-1"]))
        .await
        .expect("campaign");
    let outreach_id = outcome.results[0].outreach_id.clone().expect("drafted");

    let error = service
        .record_outreach_response(
            &outreach_id,
            ResponseLog {
                outcome: ResponseOutcome::Responded,
                summary: None,
            },
        )
        .expect_err("draft has not been sent");

    assert!(matches!(error, WorkflowError::Transition(_)));
    assert_eq!(
        store.outreach.require(&outreach_id).expect("stored").status,
        OutreachStatus::Draft
    );
}

#[tokio::test]
async fn response_is_logged_when_the_follow_up_task_cannot_be_saved() {
    let store = CrmStore {
        tasks: Arc::new(OfflineRepository),
        ..seeded_store()
    };
    let (service, store) = service_with_store(store, draft_reasoner());
    let outcome = service
        .generate_outreach("cns-1", request(&["uni-1"]))
        .await
        .expect("campaign");
    let outreach_id = outcome.results[0].outreach_id.clone().expect("drafted");
    service.mark_outreach_sent(&outreach_id).expect("sent");

    let logged = service
        .record_outreach_response(
            &outreach_id,
            ResponseLog {
                outcome: ResponseOutcome::FollowUpNeeded,
                summary: Some("Asked for transcripts".to_string()),
            },
        )
        .expect("response logged");

    assert!(logged.follow_up_task.is_none());
    assert_eq!(logged.follow_up_error.as_deref(), Some("store_unavailable"));
    assert_eq!(
        store.outreach.require(&outreach_id).expect("stored").status,
        OutreachStatus::FollowUpNeeded
    );
}
