use crate::{
    auth::Principal,
    dto::{VehicleRequest, VehicleResponse},
    errors::ServiceError,
    handlers::{
        common::{created, no_content, validate_input, Created},
        AppState,
    },
    models::vehicle::MaintenanceReport,
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

pub fn vehicle_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_vehicle))
        .route(
            "/:id",
            get(get_vehicle).put(update_vehicle).delete(delete_vehicle),
        )
        .route("/:id/maintenance", get(maintenance_report))
}

#[utoipa::path(
    post,
    path = "/api/v1/vehicles",
    request_body = VehicleRequest,
    responses(
        (status = 201, description = "Vehicle registered", body = ApiResponse<VehicleResponse>),
        (status = 409, description = "License plate already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "vehicles"
)]
pub async fn create_vehicle(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<VehicleRequest>,
) -> Created<VehicleResponse> {
    principal.require_dispatcher()?;
    validate_input(&payload)?;

    let vehicle = state.services.vehicles.create_vehicle(payload).await?;
    Ok(created(VehicleResponse::from(vehicle)))
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/:id",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle fetched", body = ApiResponse<VehicleResponse>),
        (status = 404, description = "Vehicle not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "vehicles"
)]
pub async fn get_vehicle(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<VehicleResponse> {
    let vehicle = state.services.vehicles.get_vehicle(id).await?;
    Ok(Json(ApiResponse::success(VehicleResponse::from(vehicle))))
}

#[utoipa::path(
    put,
    path = "/api/v1/vehicles/:id",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = VehicleRequest,
    responses(
        (status = 200, description = "Vehicle updated", body = ApiResponse<VehicleResponse>),
        (status = 404, description = "Vehicle not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "License plate already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "vehicles"
)]
pub async fn update_vehicle(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<VehicleRequest>,
) -> ApiResult<VehicleResponse> {
    principal.require_dispatcher()?;
    validate_input(&payload)?;

    let vehicle = state.services.vehicles.update_vehicle(id, payload).await?;
    Ok(Json(ApiResponse::success(VehicleResponse::from(vehicle))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/vehicles/:id",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 204, description = "Vehicle deleted"),
        (status = 404, description = "Vehicle not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Vehicle used by an active assignment", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "vehicles"
)]
pub async fn delete_vehicle(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    principal.require_dispatcher()?;
    state.services.vehicles.delete_vehicle(id).await?;
    Ok(no_content())
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/:id/maintenance",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Service interval status", body = ApiResponse<MaintenanceReport>),
        (status = 404, description = "Vehicle not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "vehicles"
)]
pub async fn maintenance_report(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<MaintenanceReport> {
    let report = state.services.vehicles.maintenance_report(id).await?;
    Ok(Json(ApiResponse::success(report)))
}
