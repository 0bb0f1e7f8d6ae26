use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use admissions_ai::config::AppConfig;
use admissions_ai::error::AppError;
use admissions_ai::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState};
use crate::routes::with_operational_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = build_service(&config)?;
    let app = with_operational_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        reasoner = config.reasoner.is_configured(),
        "admissions CRM service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
