use std::borrow::Cow;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::{
    bracket::{engine::EngineError, seeding::SeedError},
    challonge::ChallongeError,
    dao::storage::StorageError,
    state::lifecycle::InvalidTransition,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("{0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("{0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("{0} not found")]
    NotFound(String),
    /// A uniqueness rule or a concurrent assignment was violated.
    #[error("{0}")]
    Conflict(String),
    /// The tournament was modified since the client read it.
    #[error("tournament was modified by someone else (current version {current_version})")]
    VersionConflict { current_version: u64 },
    /// Challonge refused or failed a forwarded call.
    #[error(transparent)]
    Remote(#[from] ChallongeError),
    /// Operation needs Challonge but no API key is configured.
    #[error("Challonge integration is not configured")]
    RemoteDisabled,
    /// Unexpected failure.
    #[error("{0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<SeedError> for ServiceError {
    fn from(err: SeedError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

/// One failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    /// Dotted path of the offending field (`seeds[2].seed`), or `body` for whole-request rules.
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// Request failed validation; every failure is listed.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("{message}")]
    Conflict {
        message: String,
        current_version: Option<u64>,
    },
    /// Upstream Challonge failure.
    #[error("{0}")]
    BadGateway(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) | ServiceError::InvalidState(message) => {
                AppError::BadRequest(message)
            }
            err @ ServiceError::NotFound(_) => AppError::NotFound(err.to_string()),
            ServiceError::Conflict(message) => AppError::Conflict {
                message,
                current_version: None,
            },
            err @ ServiceError::VersionConflict { current_version } => AppError::Conflict {
                message: err.to_string(),
                current_version: Some(current_version),
            },
            ServiceError::Remote(ChallongeError::NotFound { path }) => {
                AppError::NotFound(format!("Challonge resource `{path}` not found"))
            }
            ServiceError::Remote(err) => AppError::BadGateway(err.to_string()),
            err @ ServiceError::RemoteDisabled => AppError::ServiceUnavailable(err.to_string()),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        let mut details = Vec::new();
        flatten(&err, "", &mut details);
        AppError::Validation(details)
    }
}

/// Walk nested validation errors, building dotted field paths.
fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldError>) {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));
    for (field, kind) in fields {
        let path = match (prefix.is_empty(), field.as_ref()) {
            (true, "__all__") => "body".to_owned(),
            (false, "__all__") => prefix.to_owned(),
            (true, name) => name.to_owned(),
            (false, name) => format!("{prefix}.{name}"),
        };
        match kind {
            ValidationErrorsKind::Field(failures) => {
                out.extend(failures.iter().map(|failure| {
                    let message = failure
                        .message
                        .clone()
                        .unwrap_or_else(|| Cow::Owned(format!("failed `{}` check", failure.code)));
                    FieldError::new(path.clone(), message)
                }));
            }
            ValidationErrorsKind::Struct(inner) => flatten(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

/// Error payload shared by every failing route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
    /// Stored tournament version, on optimistic locking conflicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error = self.to_string();
        let (details, current_version) = match self {
            AppError::Validation(details) => (Some(details), None),
            AppError::Conflict {
                current_version, ..
            } => (None, current_version),
            _ => (None, None),
        };

        let payload = Json(ErrorBody {
            success: false,
            error,
            details,
            current_version,
        });

        (status, payload).into_response()
    }
}
