use crate::{
    clock::SharedClock,
    db::DbPool,
    dto::VehicleRequest,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        assignment, driver,
        vehicle::{self, MaintenanceReport},
        AssignmentStatus,
    },
};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct VehicleService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    clock: SharedClock,
    warning_threshold_km: i64,
}

impl VehicleService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        clock: SharedClock,
        warning_threshold_km: i64,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            clock,
            warning_threshold_km,
        }
    }

    #[instrument(skip(self, request), fields(license_plate = %request.license_plate))]
    pub async fn create_vehicle(
        &self,
        request: VehicleRequest,
    ) -> Result<vehicle::Model, ServiceError> {
        let db = &*self.db_pool;
        let now = self.clock.now();
        ensure_plate_free(db, &request.license_plate, None).await?;

        let plate = request.license_plate.clone();
        let vehicle = vehicle::ActiveModel {
            id: Set(Uuid::new_v4()),
            license_plate: Set(request.license_plate),
            make: Set(request.make),
            model_name: Set(request.model_name),
            model_year: Set(request.model_year),
            fuel_type: Set(request.fuel_type),
            load_capacity_kg: Set(request.load_capacity_kg),
            current_mileage: Set(request.current_mileage),
            last_service_mileage: Set(request.last_service_mileage),
            next_service_mileage: Set(request.next_service_mileage),
            fuel_consumption: Set(request.fuel_consumption),
            driver_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| {
            ServiceError::from_db_with_conflict(e, || {
                ServiceError::duplicate("Vehicle", "license_plate", &plate)
            })
        })?;

        counter!("fleet.vehicles.created", 1);
        info!(vehicle_id = %vehicle.id, "Vehicle created");
        self.event_sender
            .send_or_log(Event::VehicleCreated(vehicle.id))
            .await;
        Ok(vehicle)
    }

    /// Replaces the vehicle's descriptive and telemetry fields. The driver link is managed from the driver side.
    #[instrument(skip(self, request))]
    pub async fn update_vehicle(
        &self,
        id: Uuid,
        request: VehicleRequest,
    ) -> Result<vehicle::Model, ServiceError> {
        let db = &*self.db_pool;
        let now = self.clock.now();

        let existing = load(db, id).await?;
        if existing.license_plate != request.license_plate {
            ensure_plate_free(db, &request.license_plate, Some(id)).await?;
        }
        if request.current_mileage < existing.current_mileage {
            warn!(
                vehicle_id = %id,
                from = existing.current_mileage,
                to = request.current_mileage,
                "Odometer reading decreased"
            );
        }

        let plate = request.license_plate.clone();
        let mut active: vehicle::ActiveModel = existing.into();
        active.license_plate = Set(request.license_plate);
        active.make = Set(request.make);
        active.model_name = Set(request.model_name);
        active.model_year = Set(request.model_year);
        active.fuel_type = Set(request.fuel_type);
        active.load_capacity_kg = Set(request.load_capacity_kg);
        active.current_mileage = Set(request.current_mileage);
        active.last_service_mileage = Set(request.last_service_mileage);
        active.next_service_mileage = Set(request.next_service_mileage);
        active.fuel_consumption = Set(request.fuel_consumption);
        active.updated_at = Set(now);
        let vehicle = active.update(db).await.map_err(|e| {
            ServiceError::from_db_with_conflict(e, || {
                ServiceError::duplicate("Vehicle", "license_plate", &plate)
            })
        })?;

        self.event_sender
            .send_or_log(Event::VehicleUpdated(vehicle.id))
            .await;
        Ok(vehicle)
    }

    /// Fails while an active assignment uses the vehicle; clears the linked driver's reference
    #[instrument(skip(self))]
    pub async fn delete_vehicle(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        load(&txn, id).await?;

        let active = assignment::Entity::find()
            .filter(assignment::Column::VehicleId.eq(id))
            .filter(assignment::Column::Status.is_in(AssignmentStatus::ACTIVE))
            .count(&txn)
            .await?;
        if active > 0 {
            return Err(ServiceError::Conflict(format!(
                "Vehicle {} is used by {} active assignment(s)",
                id, active
            )));
        }

        driver::Entity::update_many()
            .col_expr(driver::Column::VehicleId, Expr::value(Option::<Uuid>::None))
            .col_expr(driver::Column::UpdatedAt, Expr::value(now))
            .filter(driver::Column::VehicleId.eq(id))
            .exec(&txn)
            .await?;
        vehicle::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        counter!("fleet.vehicles.deleted", 1);
        info!(vehicle_id = %id, "Vehicle deleted");
        self.event_sender
            .send_or_log(Event::VehicleDeleted(id))
            .await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_vehicle(&self, id: Uuid) -> Result<vehicle::Model, ServiceError> {
        load(&*self.db_pool, id).await
    }

    /// Kilometres left until the next service, classified against the configured warning threshold
    #[instrument(skip(self))]
    pub async fn maintenance_report(&self, id: Uuid) -> Result<MaintenanceReport, ServiceError> {
        let vehicle = load(&*self.db_pool, id).await?;
        Ok(vehicle.maintenance_report(self.warning_threshold_km))
    }
}

async fn load<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<vehicle::Model, ServiceError> {
    vehicle::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Vehicle", "id", id))
}

async fn ensure_plate_free<C: ConnectionTrait>(
    conn: &C,
    license_plate: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let holder = vehicle::Entity::find()
        .filter(vehicle::Column::LicensePlate.eq(license_plate))
        .one(conn)
        .await?;
    match holder {
        Some(other) if Some(other.id) != except => Err(ServiceError::duplicate(
            "Vehicle",
            "license_plate",
            license_plate,
        )),
        _ => Ok(()),
    }
}
