use crate::{
    clock::SharedClock,
    db::DbPool,
    dto::AssignmentRequest,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        assignment, assignment_shipment, driver, shipment, vehicle, AssignmentStatus, Lifecycle,
        RouteStatus, ShipmentStatus,
    },
    services::shipments::{self, Transition},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// An assignment with the ids of its bound shipments, in binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentDetails {
    pub assignment: assignment::Model,
    pub shipment_ids: Vec<Uuid>,
}

/// Dispatcher owning the assignment lifecycle
#[derive(Clone)]
pub struct AssignmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    clock: SharedClock,
}

impl AssignmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, clock: SharedClock) -> Self {
        Self {
            db_pool,
            event_sender,
            clock,
        }
    }

    /// Binds a driver, a vehicle and one or more PENDING shipments
    #[instrument(skip(self, request), fields(driver_id = %request.driver_id))]
    pub async fn create_assignment(
        &self,
        request: AssignmentRequest,
    ) -> Result<AssignmentDetails, ServiceError> {
        validate_request(&request)?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        load_driver(&txn, request.driver_id).await?;
        load_vehicle(&txn, request.vehicle_id).await?;
        let bindable = load_bindable(&txn, &request.shipment_ids).await?;

        let assignment_id = Uuid::new_v4();
        let route_id = primary_route_id(&txn, &bindable, now).await?;

        let assignment = assignment::ActiveModel {
            id: Set(assignment_id),
            driver_id: Set(request.driver_id),
            vehicle_id: Set(request.vehicle_id),
            route_id: Set(route_id),
            start_time: Set(request.start_time),
            end_time: Set(request.end_time),
            status: Set(AssignmentStatus::Scheduled),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        bind(&txn, assignment_id, &request.shipment_ids).await?;
        let changes = schedule(&txn, bindable, now).await?;

        txn.commit().await?;

        counter!("fleet.assignments.created", 1);
        info!(assignment_id = %assignment.id, shipments = request.shipment_ids.len(), "Assignment created");

        self.event_sender
            .send_or_log(Event::AssignmentCreated {
                assignment_id: assignment.id,
                driver_id: assignment.driver_id,
                shipment_ids: request.shipment_ids.clone(),
            })
            .await;
        self.publish_shipment_changes(&changes).await;

        Ok(AssignmentDetails {
            assignment,
            shipment_ids: request.shipment_ids,
        })
    }

    /// Replaces driver, vehicle, window and shipment binding; the assignment goes back to SCHEDULED
    #[instrument(skip(self, request))]
    pub async fn update_assignment(
        &self,
        id: Uuid,
        request: AssignmentRequest,
    ) -> Result<AssignmentDetails, ServiceError> {
        validate_request(&request)?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        let existing = load_assignment(&txn, id).await?;
        if existing.status.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "Assignment {} is {} and can no longer be changed",
                id, existing.status
            )));
        }

        load_driver(&txn, request.driver_id).await?;
        load_vehicle(&txn, request.vehicle_id).await?;

        let current_ids = bound_shipment_ids(&txn, id).await?;
        let requested: HashSet<Uuid> = request.shipment_ids.iter().copied().collect();
        let bound: HashSet<Uuid> = current_ids.iter().copied().collect();

        let released_ids: Vec<Uuid> = current_ids
            .iter()
            .copied()
            .filter(|sid| !requested.contains(sid))
            .collect();
        let added_ids: Vec<Uuid> = request
            .shipment_ids
            .iter()
            .copied()
            .filter(|sid| !bound.contains(sid))
            .collect();

        let mut released = Vec::with_capacity(released_ids.len());
        for sid in &released_ids {
            let shipment = shipments::load(&txn, *sid).await?;
            if !matches!(
                shipment.status,
                ShipmentStatus::Pending | ShipmentStatus::Scheduled
            ) {
                return Err(ServiceError::Conflict(format!(
                    "Shipment {} is {} and cannot be released from its assignment",
                    sid, shipment.status
                )));
            }
            released.push(shipment);
        }
        let added = load_bindable(&txn, &added_ids).await?;

        // Rebind in the requested order
        assignment_shipment::Entity::delete_many()
            .filter(assignment_shipment::Column::AssignmentId.eq(id))
            .exec(&txn)
            .await?;
        bind(&txn, id, &request.shipment_ids).await?;

        let mut changes = Vec::new();
        for shipment in released {
            if let Some(change) = release(&txn, shipment, now).await? {
                changes.push(change);
            }
        }
        changes.extend(schedule(&txn, added, now).await?);

        let primary = shipments::load(&txn, request.shipment_ids[0]).await?;
        let route_id = primary_route_id(&txn, std::slice::from_ref(&primary), now).await?;

        let old_status = existing.status;
        let mut active: assignment::ActiveModel = existing.into();
        active.driver_id = Set(request.driver_id);
        active.vehicle_id = Set(request.vehicle_id);
        active.route_id = Set(route_id);
        active.start_time = Set(request.start_time);
        active.end_time = Set(request.end_time);
        active.notes = Set(request.notes);
        active.status = Set(AssignmentStatus::Scheduled);
        active.updated_at = Set(now);
        let assignment = active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::AssignmentUpdated(assignment.id))
            .await;
        if old_status != assignment.status {
            self.publish_status_change(assignment.id, old_status, assignment.status)
                .await;
        }
        self.publish_shipment_changes(&changes).await;

        Ok(AssignmentDetails {
            assignment,
            shipment_ids: request.shipment_ids,
        })
    }

    /// Removes an assignment, rolling its unfinished shipments back to PENDING
    #[instrument(skip(self))]
    pub async fn delete_assignment(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        load_assignment(&txn, id).await?;
        let shipment_ids = bound_shipment_ids(&txn, id).await?;

        assignment_shipment::Entity::delete_many()
            .filter(assignment_shipment::Column::AssignmentId.eq(id))
            .exec(&txn)
            .await?;

        let mut changes = Vec::new();
        for sid in &shipment_ids {
            let shipment = shipments::load(&txn, *sid).await?;
            if let Some(change) = release(&txn, shipment, now).await? {
                changes.push(change);
            }
        }

        assignment::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        counter!("fleet.assignments.deleted", 1);
        info!(assignment_id = %id, released = shipment_ids.len(), "Assignment deleted");

        self.event_sender
            .send_or_log(Event::AssignmentDeleted {
                assignment_id: id,
                released_shipments: shipment_ids,
            })
            .await;
        self.publish_shipment_changes(&changes).await;
        Ok(())
    }

    /// SCHEDULED -> IN_PROGRESS by the owning driver
    #[instrument(skip(self))]
    pub async fn start_assignment(
        &self,
        id: Uuid,
        driver_id: Uuid,
    ) -> Result<AssignmentDetails, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        let existing = load_owned(&txn, id, driver_id).await?;
        require_status(&existing, AssignmentStatus::Scheduled, "start")?;

        let shipment_ids = bound_shipment_ids(&txn, id).await?;
        require_shipments(id, &shipment_ids, "start")?;
        for sid in &shipment_ids {
            let shipment = shipments::load(&txn, *sid).await?;
            if !matches!(
                shipment.status,
                ShipmentStatus::Scheduled | ShipmentStatus::InTransit
            ) {
                return Err(ServiceError::Conflict(format!(
                    "Assignment cannot start while shipment {} is {}",
                    sid, shipment.status
                )));
            }
        }

        let assignment = set_status(&txn, existing, AssignmentStatus::InProgress, now, None).await?;
        txn.commit().await?;

        self.publish_status_change(id, AssignmentStatus::Scheduled, assignment.status)
            .await;
        Ok(AssignmentDetails {
            assignment,
            shipment_ids,
        })
    }

    /// IN_PROGRESS -> COMPLETED once every bound shipment is DELIVERED
    #[instrument(skip(self))]
    pub async fn complete_assignment(
        &self,
        id: Uuid,
        driver_id: Uuid,
    ) -> Result<AssignmentDetails, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        let existing = load_owned(&txn, id, driver_id).await?;
        require_status(&existing, AssignmentStatus::InProgress, "complete")?;

        let shipment_ids = bound_shipment_ids(&txn, id).await?;
        require_shipments(id, &shipment_ids, "be completed")?;
        for sid in &shipment_ids {
            let shipment = shipments::load(&txn, *sid).await?;
            if shipment.status != ShipmentStatus::Delivered {
                return Err(ServiceError::Conflict(format!(
                    "Assignment cannot be completed before delivery: shipment {} is {}",
                    sid, shipment.status
                )));
            }
        }

        let assignment =
            set_status(&txn, existing, AssignmentStatus::Completed, now, Some(now)).await?;
        txn.commit().await?;

        counter!("fleet.assignments.completed", 1);
        self.publish_status_change(id, AssignmentStatus::InProgress, assignment.status)
            .await;
        Ok(AssignmentDetails {
            assignment,
            shipment_ids,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_assignment(&self, id: Uuid) -> Result<AssignmentDetails, ServiceError> {
        let db = &*self.db_pool;
        let assignment = load_assignment(db, id).await?;
        let shipment_ids = bound_shipment_ids(db, id).await?;
        Ok(AssignmentDetails {
            assignment,
            shipment_ids,
        })
    }

    /// The driver's active schedule: SCHEDULED and IN_PROGRESS assignments in creation order
    #[instrument(skip(self))]
    pub async fn find_by_driver(
        &self,
        driver_id: Uuid,
    ) -> Result<Vec<AssignmentDetails>, ServiceError> {
        let db = &*self.db_pool;

        let assignments = assignment::Entity::find()
            .filter(assignment::Column::DriverId.eq(driver_id))
            .filter(assignment::Column::Status.is_in(AssignmentStatus::ACTIVE))
            .order_by_asc(assignment::Column::CreatedAt)
            .order_by_asc(assignment::Column::Id)
            .all(db)
            .await?;

        if assignments.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = assignments.iter().map(|a| a.id).collect();
        let mut by_assignment: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for binding in assignment_shipment::Entity::find()
            .filter(assignment_shipment::Column::AssignmentId.is_in(ids))
            .order_by_asc(assignment_shipment::Column::Position)
            .all(db)
            .await?
        {
            by_assignment
                .entry(binding.assignment_id)
                .or_default()
                .push(binding.shipment_id);
        }

        Ok(assignments
            .into_iter()
            .map(|assignment| AssignmentDetails {
                shipment_ids: by_assignment.remove(&assignment.id).unwrap_or_default(),
                assignment,
            })
            .collect())
    }

    async fn publish_status_change(
        &self,
        assignment_id: Uuid,
        old_status: AssignmentStatus,
        new_status: AssignmentStatus,
    ) {
        counter!(
            "fleet.assignments.transitions",
            1,
            "status" => new_status.to_string()
        );
        self.event_sender
            .send_or_log(Event::AssignmentStatusChanged {
                assignment_id,
                old_status,
                new_status,
            })
            .await;
    }

    async fn publish_shipment_changes(&self, changes: &[Transition]) {
        for change in changes {
            counter!(
                "fleet.shipments.transitions",
                1,
                "status" => change.shipment.status.to_string()
            );
            self.event_sender.send_or_log(change.event()).await;
        }
    }
}

fn validate_request(request: &AssignmentRequest) -> Result<(), ServiceError> {
    if request.shipment_ids.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one shipment is required".into(),
        ));
    }

    if let Some(end) = request.end_time {
        if end <= request.start_time {
            return Err(ServiceError::ValidationError(
                "end_time must be after start_time".into(),
            ));
        }
    }

    let mut seen = HashSet::with_capacity(request.shipment_ids.len());
    if let Some(dup) = request.shipment_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(ServiceError::Conflict(format!(
            "Shipment {} is listed more than once",
            dup
        )));
    }

    Ok(())
}

async fn load_assignment<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<assignment::Model, ServiceError> {
    assignment::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Assignment", "id", id))
}

/// Loads the assignment and checks that `driver_id` drives it.
async fn load_owned<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    driver_id: Uuid,
) -> Result<assignment::Model, ServiceError> {
    let found = load_assignment(conn, id).await?;
    if found.driver_id != driver_id {
        warn!(assignment_id = %id, %driver_id, "Driver does not own assignment");
        return Err(ServiceError::Forbidden(format!(
            "Assignment {} does not belong to this driver",
            id
        )));
    }
    Ok(found)
}

async fn load_driver<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<driver::Model, ServiceError> {
    driver::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Driver", "id", id))
}

async fn load_vehicle<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<vehicle::Model, ServiceError> {
    vehicle::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Vehicle", "id", id))
}

/// Every shipment must exist, be unbound and be PENDING.
async fn load_bindable<C: ConnectionTrait>(
    conn: &C,
    ids: &[Uuid],
) -> Result<Vec<shipment::Model>, ServiceError> {
    let mut found = Vec::with_capacity(ids.len());
    for id in ids {
        let shipment = shipments::load(conn, *id).await?;

        if let Some(binding) = shipments::find_binding(conn, *id).await? {
            return Err(ServiceError::Conflict(format!(
                "Shipment {} is already assigned to assignment {}",
                id, binding.assignment_id
            )));
        }

        if shipment.status != ShipmentStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "Shipment {} must be PENDING to be assigned (current status: {})",
                id, shipment.status
            )));
        }

        found.push(shipment);
    }
    Ok(found)
}

async fn bound_shipment_ids<C: ConnectionTrait>(
    conn: &C,
    assignment_id: Uuid,
) -> Result<Vec<Uuid>, ServiceError> {
    Ok(assignment_shipment::Entity::find()
        .filter(assignment_shipment::Column::AssignmentId.eq(assignment_id))
        .order_by_asc(assignment_shipment::Column::Position)
        .all(conn)
        .await?
        .into_iter()
        .map(|b| b.shipment_id)
        .collect())
}

async fn bind<C: ConnectionTrait>(
    conn: &C,
    assignment_id: Uuid,
    shipment_ids: &[Uuid],
) -> Result<(), ServiceError> {
    for (position, shipment_id) in shipment_ids.iter().enumerate() {
        assignment_shipment::ActiveModel {
            assignment_id: Set(assignment_id),
            shipment_id: Set(*shipment_id),
            position: Set(position as i32),
        }
        .insert(conn)
        .await
        .map_err(|e| {
            ServiceError::from_db_with_conflict(e, || {
                ServiceError::Conflict(format!(
                    "Shipment {} is already assigned",
                    shipment_id
                ))
            })
        })?;
    }
    Ok(())
}

/// Route of the first shipment, computing one if it has none.
async fn primary_route_id<C: ConnectionTrait>(
    conn: &C,
    candidates: &[shipment::Model],
    now: DateTime<Utc>,
) -> Result<Option<Uuid>, ServiceError> {
    let Some(primary) = candidates.first() else {
        return Ok(None);
    };

    let route = match shipments::find_route(conn, primary.id).await? {
        Some(route) => route,
        None => shipments::insert_route(conn, primary, now).await?,
    };
    Ok(Some(route.id))
}

/// PENDING -> SCHEDULED for newly bound shipments; their routes become ACTIVE.
async fn schedule<C: ConnectionTrait>(
    conn: &C,
    pending: Vec<shipment::Model>,
    now: DateTime<Utc>,
) -> Result<Vec<Transition>, ServiceError> {
    let mut changes = Vec::with_capacity(pending.len());
    for shipment in pending {
        let id = shipment.id;
        if shipments::find_route(conn, id).await?.is_none() {
            shipments::insert_route(conn, &shipment, now).await?;
        }
        let change =
            shipments::transition(conn, shipment, ShipmentStatus::Scheduled, now, |_| {}).await?;
        shipments::set_route_status(conn, id, RouteStatus::Active, now).await?;
        changes.push(change);
    }
    Ok(changes)
}

/// Rolls an unbound shipment back to PENDING. Delivered and canceled shipments keep their status.
///
/// This is a dispatcher override and does not follow the driver-facing edges.
async fn release<C: ConnectionTrait>(
    conn: &C,
    shipment: shipment::Model,
    now: DateTime<Utc>,
) -> Result<Option<Transition>, ServiceError> {
    if shipment.status.is_terminal() || shipment.status == ShipmentStatus::Pending {
        return Ok(None);
    }

    let id = shipment.id;
    let from = shipment.status;
    let mut active: shipment::ActiveModel = shipment.into();
    active.status = Set(ShipmentStatus::Pending);
    active.updated_at = Set(now);
    let shipment = active.update(conn).await?;

    shipments::set_route_status(conn, id, RouteStatus::Calculated, now).await?;
    Ok(Some(Transition { shipment, from }))
}

/// Canceling shipments can leave an assignment with nothing bound to it.
fn require_shipments(id: Uuid, shipment_ids: &[Uuid], action: &str) -> Result<(), ServiceError> {
    if shipment_ids.is_empty() {
        return Err(ServiceError::Conflict(format!(
            "Assignment {} has no shipments left and cannot {}",
            id, action
        )));
    }
    Ok(())
}

fn require_status(
    assignment: &assignment::Model,
    expected: AssignmentStatus,
    action: &str,
) -> Result<(), ServiceError> {
    if assignment.status == expected {
        Ok(())
    } else {
        Err(ServiceError::Conflict(format!(
            "Assignment must be {} to {} (current status: {})",
            expected, action, assignment.status
        )))
    }
}

async fn set_status<C: ConnectionTrait>(
    conn: &C,
    current: assignment::Model,
    next: AssignmentStatus,
    now: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
) -> Result<assignment::Model, ServiceError> {
    current.status.ensure_transition(next)?;

    let mut active: assignment::ActiveModel = current.into();
    active.status = Set(next);
    active.updated_at = Set(now);
    if let Some(end) = end_time {
        active.end_time = Set(Some(end));
    }
    Ok(active.update(conn).await?)
}
