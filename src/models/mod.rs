pub mod assignment;
pub mod assignment_shipment;
pub mod driver;
pub mod route;
pub mod shipment;
pub mod status;
pub mod vehicle;

pub use status::{AssignmentStatus, IssueType, Lifecycle, RouteStatus, ShipmentStatus};
