use crate::{
    clock::SharedClock,
    db::DbPool,
    dto::DriverRequest,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{assignment, driver, vehicle, AssignmentStatus},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Driver profiles and their vehicle link
#[derive(Clone)]
pub struct DriverService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    clock: SharedClock,
}

impl DriverService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, clock: SharedClock) -> Self {
        Self {
            db_pool,
            event_sender,
            clock,
        }
    }

    /// Creates a profile and, when a vehicle is given, links both sides in the same transaction
    #[instrument(skip(self, request), fields(license_number = %request.license_number))]
    pub async fn create_driver(&self, request: DriverRequest) -> Result<driver::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        ensure_license_free(&txn, &request.license_number, None).await?;
        ensure_user_free(&txn, request.user_id, None).await?;

        let id = Uuid::new_v4();
        if let Some(vehicle_id) = request.vehicle_id {
            claim_vehicle(&txn, vehicle_id, id, now).await?;
        }

        let driver = driver::ActiveModel {
            id: Set(id),
            user_id: Set(request.user_id),
            license_number: Set(request.license_number.clone()),
            license_expiry_date: Set(request.license_expiry_date),
            phone_number: Set(request.phone_number),
            vehicle_id: Set(request.vehicle_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_db_with_conflict(e, || {
                ServiceError::duplicate("Driver", "license_number", &request.license_number)
            })
        })?;

        txn.commit().await?;

        counter!("fleet.drivers.created", 1);
        info!(driver_id = %driver.id, "Driver created");
        self.event_sender
            .send_or_log(Event::DriverCreated(driver.id))
            .await;
        Ok(driver)
    }

    #[instrument(skip(self, request))]
    pub async fn update_driver(
        &self,
        id: Uuid,
        request: DriverRequest,
    ) -> Result<driver::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        let existing = load(&txn, id).await?;
        if existing.license_number != request.license_number {
            ensure_license_free(&txn, &request.license_number, Some(id)).await?;
        }
        if existing.user_id != request.user_id {
            ensure_user_free(&txn, request.user_id, Some(id)).await?;
        }

        if existing.vehicle_id != request.vehicle_id {
            if let Some(old) = existing.vehicle_id {
                release_vehicle(&txn, old, now).await?;
            }
            if let Some(new) = request.vehicle_id {
                claim_vehicle(&txn, new, id, now).await?;
            }
        }

        let mut active: driver::ActiveModel = existing.into();
        active.user_id = Set(request.user_id);
        active.license_number = Set(request.license_number.clone());
        active.license_expiry_date = Set(request.license_expiry_date);
        active.phone_number = Set(request.phone_number);
        active.vehicle_id = Set(request.vehicle_id);
        active.updated_at = Set(now);
        let driver = active.update(&txn).await.map_err(|e| {
            ServiceError::from_db_with_conflict(e, || {
                ServiceError::duplicate("Driver", "license_number", &request.license_number)
            })
        })?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::DriverUpdated(driver.id))
            .await;
        Ok(driver)
    }

    /// Fails while the driver has a SCHEDULED or IN_PROGRESS assignment
    #[instrument(skip(self))]
    pub async fn delete_driver(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        let existing = load(&txn, id).await?;

        let active = assignment::Entity::find()
            .filter(assignment::Column::DriverId.eq(id))
            .filter(assignment::Column::Status.is_in(AssignmentStatus::ACTIVE))
            .count(&txn)
            .await?;
        if active > 0 {
            return Err(ServiceError::Conflict(format!(
                "Driver {} still has {} active assignment(s)",
                id, active
            )));
        }

        if let Some(vehicle_id) = existing.vehicle_id {
            release_vehicle(&txn, vehicle_id, now).await?;
        }
        driver::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        counter!("fleet.drivers.deleted", 1);
        info!(driver_id = %id, "Driver deleted");
        self.event_sender
            .send_or_log(Event::DriverDeleted(id))
            .await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_driver(&self, id: Uuid) -> Result<driver::Model, ServiceError> {
        load(&*self.db_pool, id).await
    }
}

pub(crate) async fn load<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<driver::Model, ServiceError> {
    driver::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Driver", "id", id))
}

async fn ensure_license_free<C: ConnectionTrait>(
    conn: &C,
    license_number: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let holder = driver::Entity::find()
        .filter(driver::Column::LicenseNumber.eq(license_number))
        .one(conn)
        .await?;
    match holder {
        Some(other) if Some(other.id) != except => Err(ServiceError::duplicate(
            "Driver",
            "license_number",
            license_number,
        )),
        _ => Ok(()),
    }
}

async fn ensure_user_free<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let holder = driver::Entity::find()
        .filter(driver::Column::UserId.eq(user_id))
        .one(conn)
        .await?;
    match holder {
        Some(other) if Some(other.id) != except => {
            Err(ServiceError::duplicate("Driver", "user_id", user_id))
        }
        _ => Ok(()),
    }
}

/// Points the vehicle at `driver_id`. A vehicle driven by someone else is a conflict.
async fn claim_vehicle<C: ConnectionTrait>(
    conn: &C,
    vehicle_id: Uuid,
    driver_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let found = vehicle::Entity::find_by_id(vehicle_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Vehicle", "id", vehicle_id))?;

    if let Some(current) = found.driver_id {
        if current != driver_id {
            return Err(ServiceError::Conflict(format!(
                "Vehicle {} is already linked to driver {}",
                vehicle_id, current
            )));
        }
    }

    let mut active: vehicle::ActiveModel = found.into();
    active.driver_id = Set(Some(driver_id));
    active.updated_at = Set(now);
    active.update(conn).await?;
    Ok(())
}

async fn release_vehicle<C: ConnectionTrait>(
    conn: &C,
    vehicle_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    vehicle::Entity::update_many()
        .col_expr(vehicle::Column::DriverId, Expr::value(Option::<Uuid>::None))
        .col_expr(vehicle::Column::UpdatedAt, Expr::value(now))
        .filter(vehicle::Column::Id.eq(vehicle_id))
        .exec(conn)
        .await?;
    Ok(())
}
