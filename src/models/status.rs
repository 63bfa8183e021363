//! Closed status types for the shipment, assignment and route lifecycles.
//!
//! The same enums are persisted (as text), carried through the services and
//! serialized on the wire, so an unrecognized status can never reach business
//! logic: it fails to decode instead.

use crate::errors::ServiceError;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Transition table shared by the lifecycle enums.
pub trait Lifecycle: Copy + PartialEq + fmt::Display {
    /// Name of the entity the lifecycle belongs to, used in conflict messages.
    const ENTITY: &'static str;

    fn can_transition_to(self, next: Self) -> bool;

    fn is_terminal(self) -> bool;

    /// Checks the edge `self -> next`, reporting a conflict when it is not in the table.
    fn ensure_transition(self, next: Self) -> Result<(), ServiceError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(ServiceError::Conflict(format!(
                "{} cannot move from {} to {}",
                Self::ENTITY,
                self,
                next
            )))
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "SCHEDULED")]
    Scheduled,
    #[sea_orm(string_value = "IN_TRANSIT")]
    InTransit,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "DELAYED")]
    Delayed,
    #[sea_orm(string_value = "OVERDUE")]
    Overdue,
    #[sea_orm(string_value = "CANCELED")]
    Canceled,
}

impl ShipmentStatus {
    /// Statuses the overdue reconciler leaves untouched.
    pub const RECONCILED: [ShipmentStatus; 3] = [
        ShipmentStatus::Delivered,
        ShipmentStatus::Canceled,
        ShipmentStatus::Overdue,
    ];
}

impl Lifecycle for ShipmentStatus {
    const ENTITY: &'static str = "Shipment";

    fn can_transition_to(self, next: Self) -> bool {
        use ShipmentStatus::*;
        match (self, next) {
            (Pending, Scheduled) => true,
            // released by the dispatcher when an assignment drops the shipment
            (Scheduled, Pending) => true,
            (Scheduled, InTransit) => true,
            (InTransit, Delivered) | (InTransit, Delayed) | (InTransit, Overdue) => true,
            (Delayed, InTransit) => true,
            (from, Canceled) => !from.is_terminal(),
            _ => false,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Canceled)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    #[sea_orm(string_value = "SCHEDULED")]
    Scheduled,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

impl AssignmentStatus {
    /// Statuses shown on a driver's schedule.
    pub const ACTIVE: [AssignmentStatus; 2] =
        [AssignmentStatus::Scheduled, AssignmentStatus::InProgress];
}

impl Lifecycle for AssignmentStatus {
    const ENTITY: &'static str = "Assignment";

    fn can_transition_to(self, next: Self) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, next),
            (Scheduled, InProgress) | (InProgress, Completed) | (InProgress, Scheduled)
        )
    }

    fn is_terminal(self) -> bool {
        self == AssignmentStatus::Completed
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "CALCULATED")]
    Calculated,
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELED")]
    Canceled,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    #[sea_orm(string_value = "VEHICLE_BREAKDOWN")]
    VehicleBreakdown,
    #[sea_orm(string_value = "TRAFFIC")]
    Traffic,
    #[sea_orm(string_value = "WEATHER")]
    Weather,
    #[sea_orm(string_value = "ADDRESS_NOT_FOUND")]
    AddressNotFound,
    #[sea_orm(string_value = "RECIPIENT_UNAVAILABLE")]
    RecipientUnavailable,
    #[sea_orm(string_value = "DAMAGED_CARGO")]
    DamagedCargo,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ShipmentStatus::Pending, ShipmentStatus::Scheduled)]
    #[case(ShipmentStatus::Scheduled, ShipmentStatus::InTransit)]
    #[case(ShipmentStatus::InTransit, ShipmentStatus::Delivered)]
    #[case(ShipmentStatus::InTransit, ShipmentStatus::Delayed)]
    #[case(ShipmentStatus::Delayed, ShipmentStatus::InTransit)]
    #[case(ShipmentStatus::Overdue, ShipmentStatus::Canceled)]
    fn shipment_allows_workflow_edges(#[case] from: ShipmentStatus, #[case] to: ShipmentStatus) {
        assert!(from.ensure_transition(to).is_ok());
    }

    #[rstest]
    #[case(ShipmentStatus::Pending, ShipmentStatus::InTransit)]
    #[case(ShipmentStatus::Pending, ShipmentStatus::Delivered)]
    #[case(ShipmentStatus::Scheduled, ShipmentStatus::Delivered)]
    #[case(ShipmentStatus::InTransit, ShipmentStatus::InTransit)]
    #[case(ShipmentStatus::Delayed, ShipmentStatus::Delivered)]
    #[case(ShipmentStatus::Delivered, ShipmentStatus::Canceled)]
    #[case(ShipmentStatus::Canceled, ShipmentStatus::Pending)]
    fn shipment_rejects_out_of_order_edges(
        #[case] from: ShipmentStatus,
        #[case] to: ShipmentStatus,
    ) {
        assert!(matches!(
            from.ensure_transition(to),
            Err(ServiceError::Conflict(_))
        ));
    }

    #[test]
    fn assignment_edges() {
        use AssignmentStatus::*;
        assert!(Scheduled.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(Completed.is_terminal());
    }

    #[test]
    fn statuses_use_screaming_snake_case_on_the_wire() {
        assert_eq!(ShipmentStatus::InTransit.to_string(), "IN_TRANSIT");
        assert_eq!(
            serde_json::to_string(&AssignmentStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert!(serde_json::from_str::<ShipmentStatus>("\"LOST\"").is_err());
    }
}
