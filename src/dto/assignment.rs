use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::AssignmentStatus;
use crate::services::assignments::AssignmentDetails;

/// Body for creating or replacing an assignment.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AssignmentRequest {
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    /// Shipments to bind; the first one provides the assignment's route
    #[validate(length(min = 1, max = 50))]
    pub shipment_ids: Vec<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub route_id: Option<Uuid>,
    pub shipment_ids: Vec<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: AssignmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AssignmentDetails> for AssignmentResponse {
    fn from(details: AssignmentDetails) -> Self {
        let AssignmentDetails {
            assignment,
            shipment_ids,
        } = details;
        Self {
            id: assignment.id,
            driver_id: assignment.driver_id,
            vehicle_id: assignment.vehicle_id,
            route_id: assignment.route_id,
            shipment_ids,
            start_time: assignment.start_time,
            end_time: assignment.end_time,
            status: assignment.status,
            notes: assignment.notes,
            created_at: assignment.created_at,
            updated_at: assignment.updated_at,
        }
    }
}
