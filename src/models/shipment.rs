use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::status::{IssueType, ShipmentStatus};

/// Shipment entity model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
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

    // proof of delivery
    pub delivery_recipient: Option<String>,
    pub delivery_notes: Option<String>,
    pub delivery_latitude: Option<f64>,
    pub delivery_longitude: Option<f64>,

    // last reported issue
    pub issue_type: Option<IssueType>,
    pub issue_description: Option<String>,
    pub issue_estimated_delay_minutes: Option<i32>,
    pub issue_latitude: Option<f64>,
    pub issue_longitude: Option<f64>,
    pub issue_reported_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::route::Entity")]
    Route,

    #[sea_orm(has_many = "super::assignment_shipment::Entity")]
    AssignmentShipments,
}

impl Related<super::route::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Route.def()
    }
}

impl Related<super::assignment_shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssignmentShipments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True when origin or destination coordinates differ from the given ones.
    pub fn coordinates_differ(
        &self,
        origin: (Option<f64>, Option<f64>),
        destination: (Option<f64>, Option<f64>),
    ) -> bool {
        (self.origin_latitude, self.origin_longitude) != origin
            || (self.destination_latitude, self.destination_longitude) != destination
    }

    /// Check if delivery is late based on the expected delivery time
    pub fn is_late_at(&self, now: DateTime<Utc>) -> bool {
        match (self.expected_delivery_date, self.actual_delivery_date) {
            (Some(expected), Some(delivered)) => delivered > expected,
            (Some(expected), None) => now > expected,
            _ => false,
        }
    }
}
