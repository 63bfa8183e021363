use crate::{auth::Principal, errors::ServiceError, ApiResponse, AppState};
use axum::{http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

/// 201 with the standard envelope
pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

pub fn created<T>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

pub fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

/// Driver profile behind the caller's token
pub async fn current_driver(state: &AppState, principal: &Principal) -> Result<Uuid, ServiceError> {
    state.gate.driver_id_for_principal(principal).await
}
