pub mod assignment;
pub mod fleet;
pub mod shipment;

pub use assignment::{AssignmentRequest, AssignmentResponse};
pub use fleet::{DriverRequest, DriverResponse, VehicleRequest, VehicleResponse};
pub use shipment::{
    IssueReportRequest, MarkOverdueResponse, ProofOfDeliveryRequest, RouteResponse,
    ShipmentRequest, ShipmentResponse,
};
