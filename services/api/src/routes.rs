use std::sync::atomic::Ordering;
use std::sync::Arc;

use admissions_ai::workflows::{crm_router, CrmService};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json};
use serde_json::json;

use crate::infra::AppState;

pub(crate) fn with_operational_routes(service: Arc<CrmService>) -> axum::Router {
    crm_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sample_store;
    use admissions_ai::config::BusinessRules;
    use admissions_ai::reasoning::{DisabledReasoner, StructuredReasoner, Throttle};
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let reasoner = StructuredReasoner::new(
            Arc::new(DisabledReasoner::new("offline")),
            Throttle::unlimited(),
        );
        let service = Arc::new(CrmService::new(
            Arc::new(sample_store()),
            Arc::new(reasoner),
            BusinessRules::default(),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_operational_routes(service).layer(Extension(state))
    }

    async fn status_of(router: axum::Router, request: Request<Body>) -> StatusCode {
        router
            .oneshot(request)
            .await
            .expect("route executes")
            .status()
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let request = Request::get("/health").body(Body::empty()).expect("request");
        assert_eq!(status_of(app(false), request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let request = || Request::get("/ready").body(Body::empty()).expect("request");
        assert_eq!(
            status_of(app(false), request()).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_of(app(true), request()).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn workflow_routes_are_mounted() {
        let request = Request::post("/api/v1/reports/custom")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-user-id", "adm-1")
            .header("x-user-role", "admin")
            .body(Body::from("{}"))
            .expect("request");
        assert_eq!(status_of(app(true), request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn reasoning_routes_fail_cleanly_without_an_endpoint() {
        let request = Request::post("/api/v1/leads/score")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-user-id", "cns-101")
            .header("x-user-role", "counselor")
            .body(Body::from(r#"{"student_id":"stu-101"}"#))
            .expect("request");
        assert_eq!(
            status_of(app(true), request).await,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
