// Dispatch
pub mod assignments;
pub mod shipments;

// Route estimation
pub mod distance;

// Fleet administration
pub mod drivers;
pub mod vehicles;

// Background jobs
pub mod overdue;

pub use assignments::{AssignmentDetails, AssignmentService};
pub use drivers::DriverService;
pub use overdue::OverdueReconciler;
pub use shipments::{ShipmentService, ShipmentWithRoute};
pub use vehicles::VehicleService;
