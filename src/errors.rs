use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{error::DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error was produced
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{entity} not found with {field}: '{value}'")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity} already exists with {field}: '{value}'")]
    DuplicateResource {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Overdue reconciliation failed")]
    OverdueReconciliation(#[source] DbErr),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        ServiceError::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    pub fn duplicate(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        ServiceError::DuplicateResource {
            entity,
            field,
            value: value.to_string(),
        }
    }

    /// Wraps a store error, turning unique-constraint violations into the given conflict.
    pub fn from_db_with_conflict(error: DbErr, conflict: impl FnOnce() -> ServiceError) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => conflict(),
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                ServiceError::Conflict("Operation violates a reference held by another record".into())
            }
            _ => ServiceError::DatabaseError(error),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::DuplicateResource { .. } => StatusCode::CONFLICT,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::DatabaseError(_) | Self::OverdueReconciliation(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Store failures never expose driver text, identifiers or schema names.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Persistence failure".to_string(),
            Self::OverdueReconciliation(_) => "Overdue reconciliation failed".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
