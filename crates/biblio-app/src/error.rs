use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use biblio_dal::{validation::NON_FIELD_ERRORS, FieldErrors};
use http::StatusCode;
use serde_json::json;
use tracing::{debug, error};

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Conflict: {0}")]
    Conflict(FieldErrors),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<biblio_dal::Error> for ApiError {
    fn from(e: biblio_dal::Error) -> Self {
        match e {
            biblio_dal::Error::ValidationFailed(errors) => ApiError::Validation(errors),
            biblio_dal::Error::UniqueViolation(errors) => ApiError::Conflict(errors),
            biblio_dal::Error::RecordNotFound(what) => ApiError::NotFound(what),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::Validation(report.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::Internal(format!("Cannot build URL: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) | ApiError::Conflict(errors) => {
                debug!("Rejected request: {errors}");
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({"detail": format!("{what} not found.")})),
            )
                .into_response(),
            ApiError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(FieldErrors::single(NON_FIELD_ERRORS, msg)),
            )
                .into_response(),
            ApiError::Internal(msg) => {
                error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "Internal server error"})),
                )
                    .into_response()
            }
        }
    }
}
