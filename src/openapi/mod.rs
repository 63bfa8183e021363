use axum::{routing::get, Json, Router};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fleet Dispatch API",
        version = "1.0.0",
        description = r#"
# Fleet Dispatch API

Assigns drivers, vehicles and shipments to scheduled work and tracks each delivery from
PENDING to DELIVERED.

## Authentication

Every `/api/v1` endpoint expects a bearer JWT whose `sub` is the caller's user id and whose
`roles` claim lists `admin`, `dispatcher` or `driver`:

```
Authorization: Bearer <your-jwt-token>
```

Dispatchers manage assignments, shipments, drivers and vehicles. Drivers act on the
assignments and shipments bound to their own profile. Deleting an assignment requires `admin`.

## Error Handling

Failures share one body:

```json
{
  "error": "Conflict",
  "message": "Conflict: Shipment 9b2f... is already assigned",
  "request_id": "4d7c...",
  "timestamp": "2025-03-01T08:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "assignments", description = "Scheduling drivers, vehicles and shipments"),
        (name = "shipments", description = "Shipment records and the delivery lifecycle"),
        (name = "drivers", description = "Driver profiles"),
        (name = "vehicles", description = "Vehicles and maintenance status"),
        (name = "health", description = "Liveness and store reachability")
    ),
    paths(
        // Assignments
        crate::handlers::assignments::create_assignment,
        crate::handlers::assignments::get_assignment,
        crate::handlers::assignments::update_assignment,
        crate::handlers::assignments::delete_assignment,
        crate::handlers::assignments::start_assignment,
        crate::handlers::assignments::complete_assignment,
        crate::handlers::assignments::my_assignments,

        // Shipments
        crate::handlers::shipments::create_shipment,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::update_shipment,
        crate::handlers::shipments::delete_shipment,
        crate::handlers::shipments::cancel_shipment,
        crate::handlers::shipments::start_delivery,
        crate::handlers::shipments::complete_delivery,
        crate::handlers::shipments::report_issue,
        crate::handlers::shipments::resume_delivery,
        crate::handlers::shipments::mark_overdue,

        // Fleet
        crate::handlers::drivers::create_driver,
        crate::handlers::drivers::get_driver,
        crate::handlers::drivers::update_driver,
        crate::handlers::drivers::delete_driver,
        crate::handlers::vehicles::create_vehicle,
        crate::handlers::vehicles::get_vehicle,
        crate::handlers::vehicles::update_vehicle,
        crate::handlers::vehicles::delete_vehicle,
        crate::handlers::vehicles::maintenance_report,

        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::dto::AssignmentRequest,
            crate::dto::AssignmentResponse,
            crate::dto::ShipmentRequest,
            crate::dto::ShipmentResponse,
            crate::dto::RouteResponse,
            crate::dto::ProofOfDeliveryRequest,
            crate::dto::IssueReportRequest,
            crate::dto::MarkOverdueResponse,
            crate::dto::DriverRequest,
            crate::dto::DriverResponse,
            crate::dto::VehicleRequest,
            crate::dto::VehicleResponse,
            crate::models::vehicle::MaintenanceReport,
            crate::handlers::health::HealthResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serves the generated document at `/api-docs/openapi.json`
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_dispatch_paths_and_bearer_scheme() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Fleet Dispatch API"));
        assert!(json.contains("/api/v1/assignments/:id/start"));
        assert!(json.contains("/api/v1/shipments/mark-overdue"));
        assert!(json.contains("bearer_auth"));
    }
}
