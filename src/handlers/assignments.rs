use crate::{
    auth::Principal,
    dto::{AssignmentRequest, AssignmentResponse},
    errors::ServiceError,
    handlers::{
        common::{created, current_driver, no_content, validate_input, Created},
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
use tracing::warn;
use uuid::Uuid;

pub fn assignment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_assignment))
        .route("/mine", get(my_assignments))
        .route(
            "/:id",
            get(get_assignment)
                .put(update_assignment)
                .delete(delete_assignment),
        )
        .route("/:id/start", post(start_assignment))
        .route("/:id/complete", post(complete_assignment))
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments",
    request_body = AssignmentRequest,
    responses(
        (status = 201, description = "Assignment created", body = ApiResponse<AssignmentResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Driver, vehicle or shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already assigned or not PENDING", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn create_assignment(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<AssignmentRequest>,
) -> Created<AssignmentResponse> {
    principal.require_dispatcher()?;
    validate_input(&payload)?;

    let details = state.services.assignments.create_assignment(payload).await?;
    Ok(created(AssignmentResponse::from(details)))
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments/:id",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment fetched", body = ApiResponse<AssignmentResponse>),
        (status = 403, description = "Assignment belongs to another driver", body = crate::errors::ErrorResponse),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn get_assignment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<AssignmentResponse> {
    let details = state.services.assignments.get_assignment(id).await?;

    // Drivers only see their own work
    if !principal.is_dispatcher() && !state.gate.is_assignment_owned_by(id, &principal).await {
        warn!(assignment_id = %id, user_id = %principal.user_id, "Assignment read denied");
        return Err(ServiceError::Forbidden(format!(
            "Assignment {} does not belong to this driver",
            id
        )));
    }

    Ok(Json(ApiResponse::success(AssignmentResponse::from(details))))
}

#[utoipa::path(
    put,
    path = "/api/v1/assignments/:id",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = AssignmentRequest,
    responses(
        (status = 200, description = "Assignment replaced", body = ApiResponse<AssignmentResponse>),
        (status = 404, description = "Assignment or reference not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Assignment completed or shipment not releasable", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn update_assignment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignmentRequest>,
) -> ApiResult<AssignmentResponse> {
    principal.require_dispatcher()?;
    validate_input(&payload)?;

    let details = state
        .services
        .assignments
        .update_assignment(id, payload)
        .await?;
    Ok(Json(ApiResponse::success(AssignmentResponse::from(details))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/assignments/:id",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 204, description = "Assignment deleted, shipments released"),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn delete_assignment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    principal.require_admin()?;
    state.services.assignments.delete_assignment(id).await?;
    Ok(no_content())
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/:id/start",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment started", body = ApiResponse<AssignmentResponse>),
        (status = 403, description = "Not the assigned driver", body = crate::errors::ErrorResponse),
        (status = 404, description = "Assignment or driver profile not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Assignment not SCHEDULED", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn start_assignment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<AssignmentResponse> {
    let driver_id = current_driver(&state, &principal).await?;
    let details = state
        .services
        .assignments
        .start_assignment(id, driver_id)
        .await?;
    Ok(Json(ApiResponse::success(AssignmentResponse::from(details))))
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/:id/complete",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment completed", body = ApiResponse<AssignmentResponse>),
        (status = 403, description = "Not the assigned driver", body = crate::errors::ErrorResponse),
        (status = 409, description = "Assignment not IN_PROGRESS or shipments undelivered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn complete_assignment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<AssignmentResponse> {
    let driver_id = current_driver(&state, &principal).await?;
    let details = state
        .services
        .assignments
        .complete_assignment(id, driver_id)
        .await?;
    Ok(Json(ApiResponse::success(AssignmentResponse::from(details))))
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments/mine",
    responses(
        (status = 200, description = "Active assignments of the calling driver", body = ApiResponse<Vec<AssignmentResponse>>),
        (status = 404, description = "Caller has no driver profile", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn my_assignments(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<Vec<AssignmentResponse>> {
    let driver_id = current_driver(&state, &principal).await?;
    let schedule = state
        .services
        .assignments
        .find_by_driver(driver_id)
        .await?
        .into_iter()
        .map(AssignmentResponse::from)
        .collect();
    Ok(Json(ApiResponse::success(schedule)))
}
