use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelType {
    #[sea_orm(string_value = "DIESEL")]
    Diesel,
    #[sea_orm(string_value = "PETROL")]
    Petrol,
    #[sea_orm(string_value = "ELECTRIC")]
    Electric,
    #[sea_orm(string_value = "HYBRID")]
    Hybrid,
    #[sea_orm(string_value = "LPG")]
    Lpg,
}

/// Vehicle entity model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub license_plate: String,
    pub make: String,
    pub model_name: String,
    pub model_year: i32,
    pub fuel_type: FuelType,
    pub load_capacity_kg: f64,
    pub current_mileage: i32,
    pub last_service_mileage: i32,
    pub next_service_mileage: i32,
    /// Litres (or kWh) per 100 km.
    pub fuel_consumption: Option<f64>,
    pub driver_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignments,
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    Ok,
    Warning,
    Overdue,
}

/// Service-interval snapshot for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceReport {
    pub vehicle_id: Uuid,
    pub license_plate: String,
    pub current_mileage: i32,
    pub next_service_mileage: i32,
    pub remaining_km: i64,
    pub status: MaintenanceStatus,
}

impl Model {
    pub fn remaining_service_km(&self) -> i64 {
        i64::from(self.next_service_mileage) - i64::from(self.current_mileage)
    }

    pub fn maintenance_report(&self, warning_threshold_km: i64) -> MaintenanceReport {
        let remaining_km = self.remaining_service_km();
        MaintenanceReport {
            vehicle_id: self.id,
            license_plate: self.license_plate.clone(),
            current_mileage: self.current_mileage,
            next_service_mileage: self.next_service_mileage,
            remaining_km,
            status: maintenance_status(remaining_km, warning_threshold_km),
        }
    }
}

pub fn maintenance_status(remaining_km: i64, warning_threshold_km: i64) -> MaintenanceStatus {
    if remaining_km < 0 {
        MaintenanceStatus::Overdue
    } else if remaining_km <= warning_threshold_km {
        MaintenanceStatus::Warning
    } else {
        MaintenanceStatus::Ok
    }
}
