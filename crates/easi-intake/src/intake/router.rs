use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};

use super::domain::{NewSystemIntake, Principal, RejectionRequest, SystemIntakeUpdate};
use super::errors::decode_body;
use super::repository::{IntakeRepository, Notifier, SubmissionClient};
use super::service::SystemIntakeService;

type Service<R, S, N> = Arc<SystemIntakeService<R, S, N>>;

/// Router builder exposing the intake lifecycle over HTTP.
///
/// The caller's identity is read from an `Extension<Principal>` installed by the auth layer.
pub fn intake_router<R, S, N>(service: Service<R, S, N>) -> Router
where
    R: IntakeRepository + 'static,
    S: SubmissionClient + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/system_intake",
            post(create_handler::<R, S, N>).put(update_handler::<R, S, N>),
        )
        .route(
            "/api/v1/system_intake/:intake_id",
            get(fetch_handler::<R, S, N>).delete(archive_handler::<R, S, N>),
        )
        .route(
            "/api/v1/system_intake/:intake_id/reject",
            post(reject_handler::<R, S, N>),
        )
        .route(
            "/api/v1/system_intake/:intake_id/actions",
            get(actions_handler::<R, S, N>),
        )
        .route("/api/v1/system_intakes", get(list_handler::<R, S, N>))
        .route("/api/v1/systems", get(systems_handler::<R, S, N>))
        .with_state(service)
}

fn principal_of(extension: &Option<Extension<Principal>>) -> Option<&Principal> {
    extension.as_ref().map(|Extension(principal)| principal)
}

pub(crate) async fn create_handler<R, S, N>(
    State(service): State<Service<R, S, N>>,
    principal: Option<Extension<Principal>>,
    body: Bytes,
) -> Response
where
    R: IntakeRepository + 'static,
    S: SubmissionClient + 'static,
    N: Notifier + 'static,
{
    let result = decode_body::<NewSystemIntake>(&body)
        .and_then(|candidate| service.create(principal_of(&principal), candidate));

    match result {
        Ok(intake) => (StatusCode::CREATED, Json(intake)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn fetch_handler<R, S, N>(
    State(service): State<Service<R, S, N>>,
    Path(intake_id): Path<String>,
) -> Response
where
    R: IntakeRepository + 'static,
    S: SubmissionClient + 'static,
    N: Notifier + 'static,
{
    match service.fetch(&intake_id) {
        Ok(intake) => (StatusCode::OK, Json(intake)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn update_handler<R, S, N>(
    State(service): State<Service<R, S, N>>,
    body: Bytes,
) -> Response
where
    R: IntakeRepository + 'static,
    S: SubmissionClient + 'static,
    N: Notifier + 'static,
{
    let result = decode_body::<SystemIntakeUpdate>(&body).and_then(|update| service.update(update));

    match result {
        Ok(intake) => (StatusCode::OK, Json(intake)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn reject_handler<R, S, N>(
    State(service): State<Service<R, S, N>>,
    principal: Option<Extension<Principal>>,
    Path(intake_id): Path<String>,
    body: Bytes,
) -> Response
where
    R: IntakeRepository + 'static,
    S: SubmissionClient + 'static,
    N: Notifier + 'static,
{
    let result = decode_body::<RejectionRequest>(&body)
        .and_then(|request| service.reject(principal_of(&principal), &intake_id, request));

    match result {
        Ok(intake) => (StatusCode::CREATED, Json(intake)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn archive_handler<R, S, N>(
    State(service): State<Service<R, S, N>>,
    Path(intake_id): Path<String>,
) -> Response
where
    R: IntakeRepository + 'static,
    S: SubmissionClient + 'static,
    N: Notifier + 'static,
{
    match service.archive(&intake_id) {
        Ok(intake) => (StatusCode::OK, Json(intake)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn actions_handler<R, S, N>(
    State(service): State<Service<R, S, N>>,
    Path(intake_id): Path<String>,
) -> Response
where
    R: IntakeRepository + 'static,
    S: SubmissionClient + 'static,
    N: Notifier + 'static,
{
    match service.actions(&intake_id) {
        Ok(actions) => (StatusCode::OK, Json(actions)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_handler<R, S, N>(
    State(service): State<Service<R, S, N>>,
    principal: Option<Extension<Principal>>,
) -> Response
where
    R: IntakeRepository + 'static,
    S: SubmissionClient + 'static,
    N: Notifier + 'static,
{
    match service.list_for(principal_of(&principal)) {
        Ok(intakes) => (StatusCode::OK, Json(intakes)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn systems_handler<R, S, N>(State(service): State<Service<R, S, N>>) -> Response
where
    R: IntakeRepository + 'static,
    S: SubmissionClient + 'static,
    N: Notifier + 'static,
{
    match service.list_systems() {
        Ok(systems) => (StatusCode::OK, Json(systems)).into_response(),
        Err(err) => err.into_response(),
    }
}
