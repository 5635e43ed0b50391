use crate::attendance::AttendanceServiceError;
use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::members::MemberServiceError;
use crate::notifications::{DispatchError, MailError};
use crate::scheduler::JobError;
use crate::store::RepositoryError;
use crate::telemetry::TelemetryError;
use crate::tithes::TitheServiceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Process-level failures surfaced by the binary before or outside request handling.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Database(sqlx::Error),
    Migration(sqlx::migrate::MigrateError),
    Job(JobError),
    Mail(MailError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Database(err) => write!(f, "database error: {}", err),
            AppError::Migration(err) => write!(f, "migration failed: {}", err),
            AppError::Job(err) => write!(f, "job failed: {}", err),
            AppError::Mail(err) => write!(f, "mail transport error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Database(err) => Some(err),
            AppError::Migration(err) => Some(err),
            AppError::Job(err) => Some(err),
            AppError::Mail(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        Self::Database(value)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(value)
    }
}

impl From<JobError> for AppError {
    fn from(value: JobError) -> Self {
        Self::Job(value)
    }
}

impl From<MailError> for AppError {
    fn from(value: MailError) -> Self {
        Self::Mail(value)
    }
}

/// Request-level error taxonomy mapped onto HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => ApiError::Conflict("resource already exists".to_string()),
            RepositoryError::NotFound => ApiError::NotFound("resource not found".to_string()),
            RepositoryError::Unavailable(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Signing(err) => ApiError::Internal(err.to_string()),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<MemberServiceError> for ApiError {
    fn from(value: MemberServiceError) -> Self {
        match value {
            MemberServiceError::Invalid(message) => ApiError::Validation(message),
            MemberServiceError::DuplicateEmail => ApiError::Conflict(value.to_string()),
            MemberServiceError::InvalidCredentials => ApiError::Unauthorized(value.to_string()),
            MemberServiceError::NotFound | MemberServiceError::DepartmentNotFound => {
                ApiError::NotFound(value.to_string())
            }
            MemberServiceError::Hashing(detail) => ApiError::Internal(detail),
            MemberServiceError::Repository(err) => err.into(),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Repository(err) => err.into(),
        }
    }
}

impl From<AttendanceServiceError> for ApiError {
    fn from(value: AttendanceServiceError) -> Self {
        match value {
            AttendanceServiceError::UnknownMember(_) | AttendanceServiceError::InactiveMember(_) => {
                ApiError::NotFound(value.to_string())
            }
            AttendanceServiceError::Repository(err) => err.into(),
            AttendanceServiceError::Dispatch(err) => err.into(),
        }
    }
}

impl From<TitheServiceError> for ApiError {
    fn from(value: TitheServiceError) -> Self {
        match value {
            TitheServiceError::Invalid(message) => ApiError::Validation(message),
            TitheServiceError::UnknownMember(_) => ApiError::NotFound(value.to_string()),
            TitheServiceError::ReceiptCollision { .. } => ApiError::Conflict(value.to_string()),
            TitheServiceError::Repository(err) => err.into(),
            TitheServiceError::Dispatch(err) => err.into(),
        }
    }
}

impl From<JobError> for ApiError {
    fn from(value: JobError) -> Self {
        match value {
            JobError::AlreadyRunning(_) => ApiError::Conflict(value.to_string()),
            JobError::Attendance(err) => err.into(),
            JobError::Tithes(err) => err.into(),
            JobError::Repository(err) => err.into(),
            JobError::Dispatch(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn repository_conflict_becomes_409() {
        let error: ApiError = RepositoryError::Conflict.into();
        assert_eq!(error.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = ApiError::Internal("pool timed out".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .expect("read body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(payload["error"], "internal server error");
    }
}
