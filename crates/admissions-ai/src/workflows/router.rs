use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::{
    BulkNotification, CrmService, LeadScoreRequest, MatchRequest, MilestoneUpdate,
    OnboardingSubmission, OutreachRequest, PerformanceRequest, QuizSubmission, ReportOutput,
    ReportRequest, ResponseLog, ScholarshipRequest, TransitionRequest, WorkflowError,
};
use crate::auth::{AuthError, Caller, Role};

const STAFF: &[Role] = &[Role::Admin, Role::Counselor];
const EVERYONE: &[Role] = &[Role::Admin, Role::Counselor, Role::Student];

/// Router exposing the CRM workflows under `/api/v1`.
pub fn crm_router(service: Arc<CrmService>) -> Router {
    Router::new()
        .route("/api/v1/leads/score", post(score_lead_handler))
        .route(
            "/api/v1/counselors/performance",
            post(counselor_performance_handler),
        )
        .route("/api/v1/students/matches", post(match_courses_handler))
        .route(
            "/api/v1/students/scholarships",
            post(recommend_scholarships_handler),
        )
        .route("/api/v1/reports/custom", post(custom_report_handler))
        .route("/api/v1/quizzes/grade", post(grade_quiz_handler))
        .route("/api/v1/onboarding/evaluate", post(onboarding_handler))
        .route("/api/v1/outreach/generate", post(generate_outreach_handler))
        .route("/api/v1/outreach/:outreach_id/sent", post(outreach_sent_handler))
        .route(
            "/api/v1/outreach/:outreach_id/response",
            post(outreach_response_handler),
        )
        .route(
            "/api/v1/applications/:application_id/transition",
            post(transition_handler),
        )
        .route(
            "/api/v1/applications/:application_id/milestones",
            post(milestone_handler),
        )
        .route("/api/v1/notifications/bulk", post(bulk_notification_handler))
        .with_state(service)
}

/// Map a workflow failure to its status and body. Server-side causes are
/// logged and replaced with a stable `details` code.
pub(crate) fn error_response(failure: WorkflowError) -> Response {
    let status = failure.status();
    let payload = match failure.details() {
        Some(details) => {
            error!(error = %failure, details, "request failed");
            json!({ "error": "internal error", "details": details })
        }
        None => json!({ "error": failure.to_string() }),
    };
    (status, Json(payload)).into_response()
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        error_response(self)
    }
}

fn respond<T: Serialize>(result: Result<T, WorkflowError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(failure) => error_response(failure),
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        let payload = json!({ "error": rejection.body_text() });
        (StatusCode::BAD_REQUEST, Json(payload)).into_response()
    })
}

/// Students may only act on their own profile; staff on any.
fn authorize_student(caller: &Caller, student_id: &str) -> Result<(), AuthError> {
    caller.require(EVERYONE)?;
    if caller.role == Role::Student {
        caller.require_self_or_admin(student_id)?;
    }
    Ok(())
}

macro_rules! try_response {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(rejection) => return rejection.into_response(),
        }
    };
}

async fn score_lead_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    payload: Result<Json<LeadScoreRequest>, JsonRejection>,
) -> Response {
    try_response!(caller.require(STAFF));
    let request = try_response!(body(payload));
    respond(service.score_lead(&request.student_id).await)
}

async fn counselor_performance_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    payload: Result<Json<PerformanceRequest>, JsonRejection>,
) -> Response {
    try_response!(caller.require(STAFF));
    let request = try_response!(body(payload));
    try_response!(caller.require_self_or_admin(&request.counselor_id));
    respond(service.counselor_performance(&request.counselor_id).await)
}

async fn match_courses_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    payload: Result<Json<MatchRequest>, JsonRejection>,
) -> Response {
    let request = try_response!(body(payload));
    try_response!(authorize_student(&caller, &request.student_id));
    respond(service.match_courses(&request.student_id).await)
}

async fn recommend_scholarships_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    payload: Result<Json<ScholarshipRequest>, JsonRejection>,
) -> Response {
    let request = try_response!(body(payload));
    try_response!(authorize_student(&caller, &request.student_id));
    respond(service.recommend_scholarships(&request.student_id).await)
}

async fn custom_report_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Response {
    try_response!(caller.require(STAFF));
    let request = try_response!(body(payload));
    match service.generate_report(request).await {
        Ok(ReportOutput::Json(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(ReportOutput::Csv(csv)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(failure) => error_response(failure),
    }
}

async fn grade_quiz_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    payload: Result<Json<QuizSubmission>, JsonRejection>,
) -> Response {
    try_response!(caller.require(EVERYONE));
    let submission = try_response!(body(payload));
    respond(service.grade_quiz(&caller.user_id, submission).await)
}

async fn onboarding_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    payload: Result<Json<OnboardingSubmission>, JsonRejection>,
) -> Response {
    try_response!(caller.require(STAFF));
    let submission = try_response!(body(payload));
    respond(service.evaluate_onboarding(&caller.user_id, submission).await)
}

async fn generate_outreach_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    payload: Result<Json<OutreachRequest>, JsonRejection>,
) -> Response {
    try_response!(caller.require(STAFF));
    let request = try_response!(body(payload));
    respond(service.generate_outreach(&caller.user_id, request).await)
}

async fn outreach_sent_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    Path(outreach_id): Path<String>,
) -> Response {
    try_response!(caller.require(STAFF));
    respond(service.mark_outreach_sent(&outreach_id))
}

async fn outreach_response_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    Path(outreach_id): Path<String>,
    payload: Result<Json<ResponseLog>, JsonRejection>,
) -> Response {
    try_response!(caller.require(STAFF));
    let log = try_response!(body(payload));
    respond(service.record_outreach_response(&outreach_id, log))
}

async fn transition_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    Path(application_id): Path<String>,
    payload: Result<Json<TransitionRequest>, JsonRejection>,
) -> Response {
    try_response!(caller.require(STAFF));
    let request = try_response!(body(payload));
    respond(service.transition_application(&application_id, request))
}

async fn milestone_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    Path(application_id): Path<String>,
    payload: Result<Json<MilestoneUpdate>, JsonRejection>,
) -> Response {
    try_response!(caller.require(STAFF));
    let update = try_response!(body(payload));
    respond(service.complete_milestone(&application_id, update))
}

async fn bulk_notification_handler(
    State(service): State<Arc<CrmService>>,
    caller: Caller,
    payload: Result<Json<BulkNotification>, JsonRejection>,
) -> Response {
    try_response!(caller.require(STAFF));
    let request = try_response!(body(payload));
    respond(service.notify_many(request))
}
