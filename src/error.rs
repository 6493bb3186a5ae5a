use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::models::user::UserStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("No sessions recorded for user {0} in the requested period")]
    NoSessions(i64),

    #[error("User {user_id} is not approved (status: {status})")]
    NotApproved { user_id: i64, status: UserStatus },

    #[error("User {user_id} cannot go from {from} to {to}")]
    InvalidTransition {
        user_id: i64,
        from: UserStatus,
        to: UserStatus,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage unavailable: {0}")]
    Storage(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Excel export error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Error::InvalidCoordinate(_)
            | Error::InvalidCategory(_)
            | Error::InvalidDateRange { .. }
            | Error::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::UserNotFound(_) | Error::NoSessions(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            Error::NotApproved { .. } => (StatusCode::FORBIDDEN, self.to_string()),
            Error::InvalidTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Error::Storage(err) => {
                tracing::error!(error = %err, "storage failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage is temporarily unavailable, please try again".to_string(),
                )
            }
            Error::Xlsx(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Export error: {}", err),
            ),
            Error::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
            Error::Config(_) | Error::Migrate(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Storage(err)
    }
}
