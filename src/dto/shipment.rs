use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{route, shipment, IssueType, RouteStatus, ShipmentStatus};

/// Body for creating or replacing a shipment.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ShipmentRequest {
    #[validate(length(min = 1, max = 64))]
    pub tracking_number: String,
    #[validate(range(min = 0.0))]
    pub weight_kg: f64,
    #[validate(range(min = 0.0))]
    pub volume_m3: f64,
    #[validate(length(min = 1))]
    pub origin_address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub origin_latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub origin_longitude: Option<f64>,
    #[validate(length(min = 1))]
    pub destination_address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub destination_latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub destination_longitude: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub declared_value: f64,
    pub expected_delivery_date: Option<DateTime<Utc>>,
}

/// Proof of delivery captured by the driver.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ProofOfDeliveryRequest {
    #[validate(length(min = 1, max = 255))]
    pub recipient_name: String,
    pub notes: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct IssueReportRequest {
    pub issue_type: IssueType,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(range(min = 0))]
    pub estimated_delay_minutes: Option<i32>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RouteResponse {
    pub id: Uuid,
    pub origin_address: String,
    pub destination_address: String,
    pub estimated_distance_km: f64,
    pub estimated_duration_minutes: i32,
    pub status: RouteStatus,
}

impl From<route::Model> for RouteResponse {
    fn from(model: route::Model) -> Self {
        Self {
            id: model.id,
            origin_address: model.origin_address,
            destination_address: model.destination_address,
            estimated_distance_km: model.estimated_distance_km,
            estimated_duration_minutes: model.estimated_duration_minutes,
            status: model.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShipmentResponse {
    pub id: Uuid,
    pub tracking_number: String,
    pub weight_kg: f64,
    pub volume_m3: f64,
    pub origin_address: String,
    pub origin_latitude: Option<f64>,
    pub origin_longitude: Option<f64>,
    pub destination_address: String,
    pub destination_latitude: Option<f64>,
    pub destination_longitude: Option<f64>,
    pub declared_value: f64,
    pub status: ShipmentStatus,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub delivery_recipient: Option<String>,
    pub delivery_notes: Option<String>,
    pub issue_type: Option<IssueType>,
    pub issue_description: Option<String>,
    pub issue_estimated_delay_minutes: Option<i32>,
    pub route: Option<RouteResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShipmentResponse {
    pub fn new(model: shipment::Model, route: Option<route::Model>) -> Self {
        Self {
            id: model.id,
            tracking_number: model.tracking_number,
            weight_kg: model.weight_kg,
            volume_m3: model.volume_m3,
            origin_address: model.origin_address,
            origin_latitude: model.origin_latitude,
            origin_longitude: model.origin_longitude,
            destination_address: model.destination_address,
            destination_latitude: model.destination_latitude,
            destination_longitude: model.destination_longitude,
            declared_value: model.declared_value,
            status: model.status,
            expected_delivery_date: model.expected_delivery_date,
            actual_delivery_date: model.actual_delivery_date,
            delivery_recipient: model.delivery_recipient,
            delivery_notes: model.delivery_notes,
            issue_type: model.issue_type,
            issue_description: model.issue_description,
            issue_estimated_delay_minutes: model.issue_estimated_delay_minutes,
            route: route.map(RouteResponse::from),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkOverdueResponse {
    /// Number of shipments moved to OVERDUE by this run
    pub updated: u64,
}
