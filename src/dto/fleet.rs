use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{driver, vehicle, vehicle::FuelType};

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct DriverRequest {
    /// Account the driver signs in with
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 50))]
    pub license_number: String,
    pub license_expiry_date: NaiveDate,
    #[validate(length(min = 5, max = 32))]
    pub phone_number: String,
    pub vehicle_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DriverResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub license_number: String,
    pub license_expiry_date: NaiveDate,
    pub phone_number: String,
    pub vehicle_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<driver::Model> for DriverResponse {
    fn from(model: driver::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            license_number: model.license_number,
            license_expiry_date: model.license_expiry_date,
            phone_number: model.phone_number,
            vehicle_id: model.vehicle_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct VehicleRequest {
    #[validate(length(min = 1, max = 20))]
    pub license_plate: String,
    #[validate(length(min = 1))]
    pub make: String,
    #[validate(length(min = 1))]
    pub model_name: String,
    #[validate(range(min = 1900, max = 2100))]
    pub model_year: i32,
    pub fuel_type: FuelType,
    #[validate(range(min = 0.0))]
    pub load_capacity_kg: f64,
    #[validate(range(min = 0))]
    pub current_mileage: i32,
    #[validate(range(min = 0))]
    pub last_service_mileage: i32,
    #[validate(range(min = 0))]
    pub next_service_mileage: i32,
    #[validate(range(min = 0.0))]
    pub fuel_consumption: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VehicleResponse {
    pub id: Uuid,
    pub license_plate: String,
    pub make: String,
    pub model_name: String,
    pub model_year: i32,
    pub fuel_type: FuelType,
    pub load_capacity_kg: f64,
    pub current_mileage: i32,
    pub last_service_mileage: i32,
    pub next_service_mileage: i32,
    pub fuel_consumption: Option<f64>,
    pub driver_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<vehicle::Model> for VehicleResponse {
    fn from(model: vehicle::Model) -> Self {
        Self {
            id: model.id,
            license_plate: model.license_plate,
            make: model.make,
            model_name: model.model_name,
            model_year: model.model_year,
            fuel_type: model.fuel_type,
            load_capacity_kg: model.load_capacity_kg,
            current_mileage: model.current_mileage,
            last_service_mileage: model.last_service_mileage,
            next_service_mileage: model.next_service_mileage,
            fuel_consumption: model.fuel_consumption,
            driver_id: model.driver_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
