use crate::{
    auth::Principal,
    dto::{
        IssueReportRequest, MarkOverdueResponse, ProofOfDeliveryRequest, ShipmentRequest,
        ShipmentResponse,
    },
    errors::ServiceError,
    handlers::{
        common::{created, current_driver, no_content, validate_input, Created},
        AppState,
    },
    models::shipment,
    services::ShipmentWithRoute,
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

pub fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_shipment))
        .route("/mark-overdue", post(mark_overdue))
        .route(
            "/:id",
            get(get_shipment)
                .put(update_shipment)
                .delete(delete_shipment),
        )
        .route("/:id/cancel", post(cancel_shipment))
        .route("/:id/start", post(start_delivery))
        .route("/:id/deliver", post(complete_delivery))
        .route("/:id/issue", post(report_issue))
        .route("/:id/resume", post(resume_delivery))
}

impl From<ShipmentWithRoute> for ShipmentResponse {
    fn from(found: ShipmentWithRoute) -> Self {
        ShipmentResponse::new(found.shipment, found.route)
    }
}

/// Reloads the route after a driver action so the response carries its new status.
async fn with_route(
    state: &AppState,
    model: shipment::Model,
) -> Result<ShipmentResponse, ServiceError> {
    let found = state.services.shipments.get_shipment(model.id).await?;
    Ok(ShipmentResponse::from(found))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments",
    request_body = ShipmentRequest,
    responses(
        (status = 201, description = "Shipment created with its route", body = ApiResponse<ShipmentResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Tracking number already used", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<ShipmentRequest>,
) -> Created<ShipmentResponse> {
    principal.require_dispatcher()?;
    validate_input(&payload)?;

    let found = state.services.shipments.create_shipment(payload).await?;
    Ok(created(ShipmentResponse::from(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/:id",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment fetched", body = ApiResponse<ShipmentResponse>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentResponse> {
    let found = state.services.shipments.get_shipment(id).await?;
    Ok(Json(ApiResponse::success(ShipmentResponse::from(found))))
}

#[utoipa::path(
    put,
    path = "/api/v1/shipments/:id",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = ShipmentRequest,
    responses(
        (status = 200, description = "Shipment updated", body = ApiResponse<ShipmentResponse>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Tracking number already used", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn update_shipment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShipmentRequest>,
) -> ApiResult<ShipmentResponse> {
    principal.require_dispatcher()?;
    validate_input(&payload)?;

    let found = state.services.shipments.update_shipment(id, payload).await?;
    Ok(Json(ApiResponse::success(ShipmentResponse::from(found))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/shipments/:id",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 204, description = "Shipment and route deleted"),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment still assigned", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn delete_shipment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    principal.require_dispatcher()?;
    state.services.shipments.delete_shipment(id).await?;
    Ok(no_content())
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/cancel",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment canceled", body = ApiResponse<ShipmentResponse>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already delivered or canceled", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn cancel_shipment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentResponse> {
    principal.require_dispatcher()?;
    let found = state.services.shipments.cancel_shipment(id).await?;
    Ok(Json(ApiResponse::success(ShipmentResponse::from(found))))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/start",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment in transit", body = ApiResponse<ShipmentResponse>),
        (status = 409, description = "Not assigned to caller or not SCHEDULED", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn start_delivery(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentResponse> {
    let driver_id = current_driver(&state, &principal).await?;
    let model = state
        .services
        .shipments
        .start_delivery(id, driver_id)
        .await?;
    Ok(Json(ApiResponse::success(with_route(&state, model).await?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/deliver",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = ProofOfDeliveryRequest,
    responses(
        (status = 200, description = "Shipment delivered", body = ApiResponse<ShipmentResponse>),
        (status = 400, description = "Recipient missing", body = crate::errors::ErrorResponse),
        (status = 409, description = "Not assigned to caller or not IN_TRANSIT", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn complete_delivery(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProofOfDeliveryRequest>,
) -> ApiResult<ShipmentResponse> {
    validate_input(&payload)?;
    let driver_id = current_driver(&state, &principal).await?;
    let model = state
        .services
        .shipments
        .complete_delivery(id, driver_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(with_route(&state, model).await?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/issue",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = IssueReportRequest,
    responses(
        (status = 200, description = "Shipment delayed", body = ApiResponse<ShipmentResponse>),
        (status = 409, description = "Not assigned to caller or not IN_TRANSIT", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn report_issue(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<IssueReportRequest>,
) -> ApiResult<ShipmentResponse> {
    validate_input(&payload)?;
    let driver_id = current_driver(&state, &principal).await?;
    let model = state
        .services
        .shipments
        .report_issue(id, driver_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(with_route(&state, model).await?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/resume",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment back in transit", body = ApiResponse<ShipmentResponse>),
        (status = 409, description = "Not assigned to caller or not DELAYED", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn resume_delivery(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentResponse> {
    let driver_id = current_driver(&state, &principal).await?;
    let model = state
        .services
        .shipments
        .resume_delivery(id, driver_id)
        .await?;
    Ok(Json(ApiResponse::success(with_route(&state, model).await?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/mark-overdue",
    responses(
        (status = 200, description = "Number of shipments flagged OVERDUE", body = ApiResponse<MarkOverdueResponse>),
        (status = 500, description = "Reconciliation failed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn mark_overdue(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<MarkOverdueResponse> {
    principal.require_dispatcher()?;
    let updated = state.services.overdue.mark_overdue().await?;
    Ok(Json(ApiResponse::success(MarkOverdueResponse { updated })))
}
