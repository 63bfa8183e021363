use crate::{
    clock::SharedClock,
    db::DbPool,
    dto::{IssueReportRequest, ProofOfDeliveryRequest, ShipmentRequest},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{assignment, assignment_shipment, route, shipment, Lifecycle, RouteStatus, ShipmentStatus},
    services::distance,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// A shipment together with the route it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentWithRoute {
    pub shipment: shipment::Model,
    pub route: Option<route::Model>,
}

/// Result of a committed status change.
#[derive(Debug, Clone)]
pub(crate) struct Transition {
    pub shipment: shipment::Model,
    pub from: ShipmentStatus,
}

impl Transition {
    pub fn event(&self) -> Event {
        Event::ShipmentStatusChanged {
            shipment_id: self.shipment.id,
            old_status: self.from,
            new_status: self.shipment.status,
        }
    }
}

/// Service for managing shipments and their delivery lifecycle
#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    clock: SharedClock,
}

impl ShipmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, clock: SharedClock) -> Self {
        Self {
            db_pool,
            event_sender,
            clock,
        }
    }

    /// Creates a PENDING shipment and computes its route
    #[instrument(skip(self, request), fields(tracking_number = %request.tracking_number))]
    pub async fn create_shipment(
        &self,
        request: ShipmentRequest,
    ) -> Result<ShipmentWithRoute, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        if find_by_tracking_number(&txn, &request.tracking_number)
            .await?
            .is_some()
        {
            return Err(ServiceError::duplicate(
                "Shipment",
                "tracking_number",
                &request.tracking_number,
            ));
        }

        let now = self.clock.now();
        let tracking_number = request.tracking_number.clone();
        let model = shipment::ActiveModel {
            id: Set(Uuid::new_v4()),
            tracking_number: Set(request.tracking_number),
            weight_kg: Set(request.weight_kg),
            volume_m3: Set(request.volume_m3),
            origin_address: Set(request.origin_address),
            origin_latitude: Set(request.origin_latitude),
            origin_longitude: Set(request.origin_longitude),
            destination_address: Set(request.destination_address),
            destination_latitude: Set(request.destination_latitude),
            destination_longitude: Set(request.destination_longitude),
            declared_value: Set(request.declared_value),
            status: Set(ShipmentStatus::Pending),
            expected_delivery_date: Set(request.expected_delivery_date),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let shipment = model.insert(&txn).await.map_err(|e| {
            ServiceError::from_db_with_conflict(e, || {
                ServiceError::duplicate("Shipment", "tracking_number", &tracking_number)
            })
        })?;
        let route = insert_route(&txn, &shipment, now).await?;

        txn.commit().await?;

        counter!("fleet.shipments.created", 1);
        info!(shipment_id = %shipment.id, "Shipment created");
        self.event_sender
            .send_or_log(Event::ShipmentCreated(shipment.id))
            .await;

        Ok(ShipmentWithRoute {
            shipment,
            route: Some(route),
        })
    }

    /// Replaces the descriptive fields of a shipment. Status and delivery time are untouched.
    #[instrument(skip(self, request))]
    pub async fn update_shipment(
        &self,
        id: Uuid,
        request: ShipmentRequest,
    ) -> Result<ShipmentWithRoute, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let existing = load(&txn, id).await?;

        if request.tracking_number != existing.tracking_number {
            if let Some(other) = find_by_tracking_number(&txn, &request.tracking_number).await? {
                if other.id != id {
                    return Err(ServiceError::duplicate(
                        "Shipment",
                        "tracking_number",
                        &request.tracking_number,
                    ));
                }
            }
        }

        let coordinates_changed = existing.coordinates_differ(
            (request.origin_latitude, request.origin_longitude),
            (request.destination_latitude, request.destination_longitude),
        );
        let addresses_changed = existing.origin_address != request.origin_address
            || existing.destination_address != request.destination_address;

        let now = self.clock.now();
        let tracking_number = request.tracking_number.clone();
        let mut active: shipment::ActiveModel = existing.into();
        active.tracking_number = Set(request.tracking_number);
        active.weight_kg = Set(request.weight_kg);
        active.volume_m3 = Set(request.volume_m3);
        active.origin_address = Set(request.origin_address);
        active.origin_latitude = Set(request.origin_latitude);
        active.origin_longitude = Set(request.origin_longitude);
        active.destination_address = Set(request.destination_address);
        active.destination_latitude = Set(request.destination_latitude);
        active.destination_longitude = Set(request.destination_longitude);
        active.declared_value = Set(request.declared_value);
        active.expected_delivery_date = Set(request.expected_delivery_date);
        active.updated_at = Set(now);

        let shipment = active.update(&txn).await.map_err(|e| {
            ServiceError::from_db_with_conflict(e, || {
                ServiceError::duplicate("Shipment", "tracking_number", &tracking_number)
            })
        })?;

        let route = match find_route(&txn, id).await? {
            None => insert_route(&txn, &shipment, now).await?,
            Some(route) if coordinates_changed => {
                refresh_route(&txn, route, &shipment, true, now).await?
            }
            Some(route) if addresses_changed => {
                refresh_route(&txn, route, &shipment, false, now).await?
            }
            Some(route) => route,
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ShipmentUpdated(shipment.id))
            .await;

        Ok(ShipmentWithRoute {
            shipment,
            route: Some(route),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_shipment(&self, id: Uuid) -> Result<ShipmentWithRoute, ServiceError> {
        let db = &*self.db_pool;
        let shipment = load(db, id).await?;
        let route = find_route(db, id).await?;
        Ok(ShipmentWithRoute { shipment, route })
    }

    /// Removes a shipment and its route. A shipment still bound to an assignment is rejected.
    #[instrument(skip(self))]
    pub async fn delete_shipment(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        load(&txn, id).await?;

        if find_binding(&txn, id).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Shipment {} is bound to an assignment",
                id
            )));
        }

        route::Entity::delete_many()
            .filter(route::Column::ShipmentId.eq(id))
            .exec(&txn)
            .await?;
        shipment::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| {
                ServiceError::from_db_with_conflict(e, || {
                    ServiceError::Conflict(format!("Shipment {} is still referenced", id))
                })
            })?;

        txn.commit().await?;

        info!(shipment_id = %id, "Shipment deleted");
        self.event_sender
            .send_or_log(Event::ShipmentDeleted(id))
            .await;
        Ok(())
    }

    /// Cancels a non-terminal shipment and releases it from its assignment
    #[instrument(skip(self))]
    pub async fn cancel_shipment(&self, id: Uuid) -> Result<ShipmentWithRoute, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        let current = load(&txn, id).await?;
        let change = transition(&txn, current, ShipmentStatus::Canceled, now, |_| {}).await?;
        set_route_status(&txn, id, RouteStatus::Canceled, now).await?;

        if let Some(binding) = find_binding(&txn, id).await? {
            assignment_shipment::Entity::delete_many()
                .filter(assignment_shipment::Column::ShipmentId.eq(id))
                .exec(&txn)
                .await?;
            repoint_assignment_route(&txn, binding.assignment_id, now).await?;
        }

        let route = find_route(&txn, id).await?;
        txn.commit().await?;

        self.publish(&change).await;
        Ok(ShipmentWithRoute {
            shipment: change.shipment,
            route,
        })
    }

    /// SCHEDULED -> IN_TRANSIT, by the driver the shipment is assigned to
    #[instrument(skip(self))]
    pub async fn start_delivery(
        &self,
        id: Uuid,
        driver_id: Uuid,
    ) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        let current = load(&txn, id).await?;
        ensure_assigned_to(&txn, id, driver_id).await?;
        require_status(&current, ShipmentStatus::Scheduled, "start delivery")?;

        let change = transition(&txn, current, ShipmentStatus::InTransit, now, |_| {}).await?;
        txn.commit().await?;

        self.publish(&change).await;
        Ok(change.shipment)
    }

    /// IN_TRANSIT -> DELIVERED, recording proof of delivery
    #[instrument(skip(self, proof))]
    pub async fn complete_delivery(
        &self,
        id: Uuid,
        driver_id: Uuid,
        proof: ProofOfDeliveryRequest,
    ) -> Result<shipment::Model, ServiceError> {
        if proof.recipient_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "recipient_name must not be blank".into(),
            ));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        let current = load(&txn, id).await?;
        ensure_assigned_to(&txn, id, driver_id).await?;
        require_status(&current, ShipmentStatus::InTransit, "complete delivery")?;

        let change = transition(&txn, current, ShipmentStatus::Delivered, now, |active| {
            active.actual_delivery_date = Set(Some(now));
            active.delivery_recipient = Set(Some(proof.recipient_name.trim().to_string()));
            active.delivery_notes = Set(proof.notes);
            active.delivery_latitude = Set(proof.latitude);
            active.delivery_longitude = Set(proof.longitude);
        })
        .await?;
        set_route_status(&txn, id, RouteStatus::Completed, now).await?;

        txn.commit().await?;

        self.publish(&change).await;
        Ok(change.shipment)
    }

    /// IN_TRANSIT -> DELAYED, recording the reported issue
    #[instrument(skip(self, issue), fields(issue_type = %issue.issue_type))]
    pub async fn report_issue(
        &self,
        id: Uuid,
        driver_id: Uuid,
        issue: IssueReportRequest,
    ) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        let current = load(&txn, id).await?;
        ensure_assigned_to(&txn, id, driver_id).await?;
        require_status(&current, ShipmentStatus::InTransit, "report an issue")?;

        let change = transition(&txn, current, ShipmentStatus::Delayed, now, |active| {
            active.issue_type = Set(Some(issue.issue_type));
            active.issue_description = Set(Some(issue.description));
            active.issue_estimated_delay_minutes = Set(issue.estimated_delay_minutes);
            active.issue_latitude = Set(issue.latitude);
            active.issue_longitude = Set(issue.longitude);
            active.issue_reported_at = Set(Some(now));
        })
        .await?;

        txn.commit().await?;

        counter!("fleet.shipments.issues_reported", 1);
        self.publish(&change).await;
        Ok(change.shipment)
    }

    /// DELAYED -> IN_TRANSIT once the driver is moving again
    #[instrument(skip(self))]
    pub async fn resume_delivery(
        &self,
        id: Uuid,
        driver_id: Uuid,
    ) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let now = self.clock.now();

        let current = load(&txn, id).await?;
        ensure_assigned_to(&txn, id, driver_id).await?;
        require_status(&current, ShipmentStatus::Delayed, "resume delivery")?;

        let change = transition(&txn, current, ShipmentStatus::InTransit, now, |_| {}).await?;
        txn.commit().await?;

        self.publish(&change).await;
        Ok(change.shipment)
    }

    async fn publish(&self, change: &Transition) {
        counter!(
            "fleet.shipments.transitions",
            1,
            "status" => change.shipment.status.to_string()
        );
        self.event_sender.send_or_log(change.event()).await;
    }
}

pub(crate) async fn load<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<shipment::Model, ServiceError> {
    shipment::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Shipment", "id", id))
}

async fn find_by_tracking_number<C: ConnectionTrait>(
    conn: &C,
    tracking_number: &str,
) -> Result<Option<shipment::Model>, ServiceError> {
    Ok(shipment::Entity::find()
        .filter(shipment::Column::TrackingNumber.eq(tracking_number))
        .one(conn)
        .await?)
}

pub(crate) async fn find_route<C: ConnectionTrait>(
    conn: &C,
    shipment_id: Uuid,
) -> Result<Option<route::Model>, ServiceError> {
    Ok(route::Entity::find()
        .filter(route::Column::ShipmentId.eq(shipment_id))
        .one(conn)
        .await?)
}

pub(crate) async fn find_binding<C: ConnectionTrait>(
    conn: &C,
    shipment_id: Uuid,
) -> Result<Option<assignment_shipment::Model>, ServiceError> {
    Ok(assignment_shipment::Entity::find()
        .filter(assignment_shipment::Column::ShipmentId.eq(shipment_id))
        .one(conn)
        .await?)
}

/// Builds the route for a shipment from its current addresses and coordinates.
pub(crate) async fn insert_route<C: ConnectionTrait>(
    conn: &C,
    shipment: &shipment::Model,
    now: DateTime<Utc>,
) -> Result<route::Model, ServiceError> {
    let estimate = distance::estimate_coordinates(
        shipment.origin_latitude,
        shipment.origin_longitude,
        shipment.destination_latitude,
        shipment.destination_longitude,
    );

    let model = route::ActiveModel {
        id: Set(Uuid::new_v4()),
        shipment_id: Set(shipment.id),
        origin_address: Set(shipment.origin_address.clone()),
        origin_latitude: Set(shipment.origin_latitude),
        origin_longitude: Set(shipment.origin_longitude),
        destination_address: Set(shipment.destination_address.clone()),
        destination_latitude: Set(shipment.destination_latitude),
        destination_longitude: Set(shipment.destination_longitude),
        estimated_distance_km: Set(estimate.distance_km),
        estimated_duration_minutes: Set(estimate.duration_minutes),
        status: Set(estimate.status),
        created_at: Set(now),
        updated_at: Set(now),
    };

    Ok(model.insert(conn).await?)
}

/// Copies addresses onto the route; the estimate is recomputed only when asked to.
async fn refresh_route<C: ConnectionTrait>(
    conn: &C,
    route: route::Model,
    shipment: &shipment::Model,
    recompute: bool,
    now: DateTime<Utc>,
) -> Result<route::Model, ServiceError> {
    let mut active: route::ActiveModel = route.into();
    active.origin_address = Set(shipment.origin_address.clone());
    active.destination_address = Set(shipment.destination_address.clone());

    if recompute {
        let estimate = distance::estimate_coordinates(
            shipment.origin_latitude,
            shipment.origin_longitude,
            shipment.destination_latitude,
            shipment.destination_longitude,
        );
        active.origin_latitude = Set(shipment.origin_latitude);
        active.origin_longitude = Set(shipment.origin_longitude);
        active.destination_latitude = Set(shipment.destination_latitude);
        active.destination_longitude = Set(shipment.destination_longitude);
        active.estimated_distance_km = Set(estimate.distance_km);
        active.estimated_duration_minutes = Set(estimate.duration_minutes);
    }
    active.updated_at = Set(now);

    Ok(active.update(conn).await?)
}

pub(crate) async fn set_route_status<C: ConnectionTrait>(
    conn: &C,
    shipment_id: Uuid,
    status: RouteStatus,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    route::Entity::update_many()
        .col_expr(route::Column::Status, Expr::value(status))
        .col_expr(route::Column::UpdatedAt, Expr::value(now))
        .filter(route::Column::ShipmentId.eq(shipment_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Moves a shipment along one edge of its lifecycle, letting the caller fill extra columns.
pub(crate) async fn transition<C, F>(
    conn: &C,
    current: shipment::Model,
    next: ShipmentStatus,
    now: DateTime<Utc>,
    fill: F,
) -> Result<Transition, ServiceError>
where
    C: ConnectionTrait,
    F: FnOnce(&mut shipment::ActiveModel),
{
    let from = current.status;
    from.ensure_transition(next)?;

    let mut active: shipment::ActiveModel = current.into();
    active.status = Set(next);
    active.updated_at = Set(now);
    fill(&mut active);

    let shipment = active.update(conn).await?;
    Ok(Transition { shipment, from })
}

fn require_status(
    shipment: &shipment::Model,
    expected: ShipmentStatus,
    action: &str,
) -> Result<(), ServiceError> {
    if shipment.status == expected {
        Ok(())
    } else {
        Err(ServiceError::Conflict(format!(
            "Shipment must be {} to {} (current status: {})",
            expected, action, shipment.status
        )))
    }
}

/// The shipment must be bound to an assignment driven by `driver_id`.
async fn ensure_assigned_to<C: ConnectionTrait>(
    conn: &C,
    shipment_id: Uuid,
    driver_id: Uuid,
) -> Result<(), ServiceError> {
    let binding = find_binding(conn, shipment_id).await?.ok_or_else(|| {
        ServiceError::Conflict(format!("Shipment {} is not assigned", shipment_id))
    })?;

    let owner = assignment::Entity::find_by_id(binding.assignment_id)
        .one(conn)
        .await?
        .map(|a| a.driver_id);

    if owner == Some(driver_id) {
        Ok(())
    } else {
        Err(ServiceError::Conflict(format!(
            "Shipment {} is not assigned to this driver",
            shipment_id
        )))
    }
}

/// Points the assignment at the route of its first remaining shipment.
pub(crate) async fn repoint_assignment_route<C: ConnectionTrait>(
    conn: &C,
    assignment_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    use sea_orm::QueryOrder;

    let first = assignment_shipment::Entity::find()
        .filter(assignment_shipment::Column::AssignmentId.eq(assignment_id))
        .order_by_asc(assignment_shipment::Column::Position)
        .one(conn)
        .await?;

    let route_id = match first {
        Some(binding) => find_route(conn, binding.shipment_id).await?.map(|r| r.id),
        None => None,
    };

    assignment::Entity::update_many()
        .col_expr(assignment::Column::RouteId, Expr::value(route_id))
        .col_expr(assignment::Column::UpdatedAt, Expr::value(now))
        .filter(assignment::Column::Id.eq(assignment_id))
        .exec(conn)
        .await?;
    Ok(())
}
