pub mod assignments;
pub mod common;
pub mod drivers;
pub mod health;
pub mod shipments;
pub mod vehicles;

use crate::{
    clock::SharedClock,
    db::DbPool,
    events::EventSender,
    services::{AssignmentService, DriverService, OverdueReconciler, ShipmentService, VehicleService},
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub assignments: Arc<AssignmentService>,
    pub shipments: Arc<ShipmentService>,
    pub drivers: Arc<DriverService>,
    pub vehicles: Arc<VehicleService>,
    pub overdue: Arc<OverdueReconciler>,
}

impl AppServices {
    /// Builds every service over the same pool, event channel and clock.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        clock: SharedClock,
        maintenance_warning_km: i64,
    ) -> Self {
        Self {
            assignments: Arc::new(AssignmentService::new(
                db_pool.clone(),
                event_sender.clone(),
                clock.clone(),
            )),
            shipments: Arc::new(ShipmentService::new(
                db_pool.clone(),
                event_sender.clone(),
                clock.clone(),
            )),
            drivers: Arc::new(DriverService::new(
                db_pool.clone(),
                event_sender.clone(),
                clock.clone(),
            )),
            vehicles: Arc::new(VehicleService::new(
                db_pool.clone(),
                event_sender.clone(),
                clock.clone(),
                maintenance_warning_km,
            )),
            overdue: Arc::new(OverdueReconciler::new(db_pool, event_sender, clock)),
        }
    }
}
