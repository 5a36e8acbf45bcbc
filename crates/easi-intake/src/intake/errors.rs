//! Error taxonomy for the intake boundary.
//!
//! Every failure produced while handling a request is folded into [`IntakeError`] before it
//! leaves the service. The HTTP status and the public message are derived from the variant tag
//! alone; the carried cause is only ever logged.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::domain::{InvalidTransition, SystemIntakeId};
use super::validation::Violations;

pub(crate) const SYSTEM_INTAKE: &str = "SystemIntake";

/// Call made against the system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalOperation {
    Submit,
    Fetch,
}

impl fmt::Display for ExternalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalOperation::Submit => f.write_str("submit"),
            ExternalOperation::Fetch => f.write_str("fetch"),
        }
    }
}

/// Channel a notification was bound for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestinationType {
    Email,
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationType::Email => f.write_str("email"),
        }
    }
}

/// Tag of an [`IntakeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    InvalidIdentifier,
    Validation,
    ResourceNotFound,
    ExternalApi,
    Notification,
    MissingPrincipal,
    Unclassified,
}

impl ErrorKind {
    pub const fn status(self) -> StatusCode {
        match self {
            ErrorKind::MalformedInput => StatusCode::BAD_REQUEST,
            ErrorKind::InvalidIdentifier | ErrorKind::Validation => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorKind::ResourceNotFound => StatusCode::NOT_FOUND,
            ErrorKind::ExternalApi => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Notification
            | ErrorKind::MissingPrincipal
            | ErrorKind::Unclassified => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "Bad request",
            ErrorKind::InvalidIdentifier | ErrorKind::Validation => "Entity unprocessable",
            ErrorKind::ResourceNotFound => "Resource not found",
            ErrorKind::ExternalApi => "Service unavailable",
            ErrorKind::Notification => "Failed to send notification",
            ErrorKind::MissingPrincipal | ErrorKind::Unclassified => "Something went wrong",
        }
    }
}

/// Classified failure of an intake operation.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("request body could not be read: {cause}")]
    MalformedInput { cause: String },
    #[error("'{raw}' is not a valid intake identifier")]
    InvalidIdentifier { raw: String },
    #[error("could not validate {model} {model_id}: {cause}")]
    Validation {
        model: &'static str,
        model_id: String,
        cause: Violations,
    },
    #[error("{model} {model_id} not found")]
    ResourceNotFound { model: &'static str, model_id: String },
    #[error("{system} failed to {operation} {model} {model_id}: {cause}")]
    ExternalApi {
        model: &'static str,
        model_id: String,
        operation: ExternalOperation,
        system: String,
        cause: String,
    },
    #[error("failed to send {destination_type} notification: {cause}")]
    Notification {
        destination_type: DestinationType,
        cause: String,
    },
    #[error("no principal attached to the request")]
    MissingPrincipal,
    #[error("unclassified failure: {cause}")]
    Unclassified { cause: String },
}

impl IntakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::MalformedInput { .. } => ErrorKind::MalformedInput,
            IntakeError::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
            IntakeError::Validation { .. } => ErrorKind::Validation,
            IntakeError::ResourceNotFound { .. } => ErrorKind::ResourceNotFound,
            IntakeError::ExternalApi { .. } => ErrorKind::ExternalApi,
            IntakeError::Notification { .. } => ErrorKind::Notification,
            IntakeError::MissingPrincipal => ErrorKind::MissingPrincipal,
            IntakeError::Unclassified { .. } => ErrorKind::Unclassified,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }

    pub fn message(&self) -> &'static str {
        self.kind().message()
    }

    pub(crate) fn validation(model_id: impl ToString, cause: Violations) -> Self {
        Self::Validation {
            model: SYSTEM_INTAKE,
            model_id: model_id.to_string(),
            cause,
        }
    }

    pub(crate) fn not_found(id: &SystemIntakeId) -> Self {
        Self::ResourceNotFound {
            model: SYSTEM_INTAKE,
            model_id: id.to_string(),
        }
    }

    pub(crate) fn unclassified(cause: impl fmt::Display) -> Self {
        Self::Unclassified {
            cause: cause.to_string(),
        }
    }

    pub(crate) fn invalid_transition(id: &SystemIntakeId, err: InvalidTransition) -> Self {
        Self::validation(id, Violations::single("status", err.to_string()))
    }
}

/// Parses a path identifier, keeping malformed input apart from semantic validation.
pub fn parse_intake_id(raw: &str) -> Result<SystemIntakeId, IntakeError> {
    SystemIntakeId::parse(raw).ok_or_else(|| IntakeError::InvalidIdentifier {
        raw: raw.to_string(),
    })
}

/// Decodes a JSON request body; any structural failure is a 400.
pub fn decode_body<T>(body: &[u8]) -> Result<T, IntakeError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_slice(body).map_err(|err| IntakeError::MalformedInput {
        cause: err.to_string(),
    })
}

/// Stable public error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: &'static str,
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = ?self.kind(), error = %self, "intake request failed");
        } else {
            warn!(kind = ?self.kind(), error = %self, "intake request rejected");
        }

        let body = ErrorResponse {
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}
