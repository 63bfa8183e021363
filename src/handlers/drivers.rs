use crate::{
    auth::Principal,
    dto::{DriverRequest, DriverResponse},
    errors::ServiceError,
    handlers::{
        common::{created, no_content, validate_input, Created},
        AppState,
    },
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

pub fn driver_routes() -> Router<AppState> {
    Router::new().route("/", post(create_driver)).route(
        "/:id",
        get(get_driver).put(update_driver).delete(delete_driver),
    )
}

#[utoipa::path(
    post,
    path = "/api/v1/drivers",
    request_body = DriverRequest,
    responses(
        (status = 201, description = "Driver profile created", body = ApiResponse<DriverResponse>),
        (status = 404, description = "Linked vehicle not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "License number or user already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "drivers"
)]
pub async fn create_driver(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<DriverRequest>,
) -> Created<DriverResponse> {
    principal.require_dispatcher()?;
    validate_input(&payload)?;

    let driver = state.services.drivers.create_driver(payload).await?;
    Ok(created(DriverResponse::from(driver)))
}

#[utoipa::path(
    get,
    path = "/api/v1/drivers/:id",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver fetched", body = ApiResponse<DriverResponse>),
        (status = 404, description = "Driver not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "drivers"
)]
pub async fn get_driver(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<DriverResponse> {
    principal.require_dispatcher()?;
    let driver = state.services.drivers.get_driver(id).await?;
    Ok(Json(ApiResponse::success(DriverResponse::from(driver))))
}

#[utoipa::path(
    put,
    path = "/api/v1/drivers/:id",
    params(("id" = Uuid, Path, description = "Driver ID")),
    request_body = DriverRequest,
    responses(
        (status = 200, description = "Driver updated", body = ApiResponse<DriverResponse>),
        (status = 404, description = "Driver or vehicle not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "License number taken or vehicle linked elsewhere", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "drivers"
)]
pub async fn update_driver(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverRequest>,
) -> ApiResult<DriverResponse> {
    principal.require_dispatcher()?;
    validate_input(&payload)?;

    let driver = state.services.drivers.update_driver(id, payload).await?;
    Ok(Json(ApiResponse::success(DriverResponse::from(driver))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/drivers/:id",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 204, description = "Driver deleted"),
        (status = 404, description = "Driver not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Driver has active assignments", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "drivers"
)]
pub async fn delete_driver(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    principal.require_dispatcher()?;
    state.services.drivers.delete_driver(id).await?;
    Ok(no_content())
}
