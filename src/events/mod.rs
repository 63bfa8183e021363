use crate::models::{AssignmentStatus, ShipmentStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes after a commit. A closed channel must not undo a committed change,
    /// so the failure is only logged.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(error) = self.send(event).await {
            warn!(%error, "dropping domain event");
        }
    }
}

/// Domain events emitted after a state change has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Assignment events
    AssignmentCreated {
        assignment_id: Uuid,
        driver_id: Uuid,
        shipment_ids: Vec<Uuid>,
    },
    AssignmentUpdated(Uuid),
    AssignmentStatusChanged {
        assignment_id: Uuid,
        old_status: AssignmentStatus,
        new_status: AssignmentStatus,
    },
    AssignmentDeleted {
        assignment_id: Uuid,
        released_shipments: Vec<Uuid>,
    },

    // Shipment events
    ShipmentCreated(Uuid),
    ShipmentUpdated(Uuid),
    ShipmentDeleted(Uuid),
    ShipmentStatusChanged {
        shipment_id: Uuid,
        old_status: ShipmentStatus,
        new_status: ShipmentStatus,
    },
    ShipmentsMarkedOverdue {
        count: u64,
    },

    // Fleet events
    DriverCreated(Uuid),
    DriverUpdated(Uuid),
    DriverDeleted(Uuid),
    VehicleCreated(Uuid),
    VehicleUpdated(Uuid),
    VehicleDeleted(Uuid),
}

impl Event {
    /// Stable name used in logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Event::AssignmentCreated { .. } => "assignment_created",
            Event::AssignmentUpdated(_) => "assignment_updated",
            Event::AssignmentStatusChanged { .. } => "assignment_status_changed",
            Event::AssignmentDeleted { .. } => "assignment_deleted",
            Event::ShipmentCreated(_) => "shipment_created",
            Event::ShipmentUpdated(_) => "shipment_updated",
            Event::ShipmentDeleted(_) => "shipment_deleted",
            Event::ShipmentStatusChanged { .. } => "shipment_status_changed",
            Event::ShipmentsMarkedOverdue { .. } => "shipments_marked_overdue",
            Event::DriverCreated(_) => "driver_created",
            Event::DriverUpdated(_) => "driver_updated",
            Event::DriverDeleted(_) => "driver_deleted",
            Event::VehicleCreated(_) => "vehicle_created",
            Event::VehicleUpdated(_) => "vehicle_updated",
            Event::VehicleDeleted(_) => "vehicle_deleted",
        }
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        metrics::counter!("fleet.events.processed", 1, "event" => event.name());

        match &event {
            Event::ShipmentStatusChanged {
                shipment_id,
                old_status,
                new_status,
            } => {
                info!(%shipment_id, %old_status, %new_status, "shipment status changed");
            }
            Event::AssignmentStatusChanged {
                assignment_id,
                old_status,
                new_status,
            } => {
                info!(%assignment_id, %old_status, %new_status, "assignment status changed");
            }
            Event::ShipmentsMarkedOverdue { count } => {
                info!(count, "shipments marked overdue");
            }
            other => debug!(event = other.name(), payload = ?other, "domain event"),
        }
    }

    info!("Event processing loop stopped");
}
