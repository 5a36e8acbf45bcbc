use crate::infra::AppState;
use axum::extract::Request;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use easi_intake::intake::{
    intake_router, IntakeRepository, Notifier, Principal, SubmissionClient, SystemIntakeService,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) const EUA_USER_ID_HEADER: &str = "eua-user-id";
pub(crate) const JOB_CODE_HEADER: &str = "job-code-easi";

pub(crate) fn with_intake_routes<R, S, N>(
    service: Arc<SystemIntakeService<R, S, N>>,
) -> axum::Router
where
    R: IntakeRepository + 'static,
    S: SubmissionClient + 'static,
    N: Notifier + 'static,
{
    intake_router(service)
        .layer(middleware::from_fn(attach_principal))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

/// Builds the caller identity from the gateway headers. Requests without an EUA id carry no
/// principal.
pub(crate) fn principal_from_headers(headers: &HeaderMap) -> Option<Principal> {
    let eua_id = headers
        .get(EUA_USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())?;

    let job_code_easi = headers
        .get(JOB_CODE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    Some(Principal {
        eua_id: eua_id.to_string(),
        job_code_easi,
    })
}

pub(crate) async fn attach_principal(mut request: Request, next: Next) -> Response {
    if let Some(principal) = principal_from_headers(request.headers()) {
        request.extensions_mut().insert(principal);
    }
    next.run(request).await
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
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
