mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{shipment_request, TestApp};
use fleet_dispatch::{
    dto::{IssueReportRequest, ProofOfDeliveryRequest},
    errors::ServiceError,
    models::{AssignmentStatus, IssueType, RouteStatus, ShipmentStatus},
};
use rstest::rstest;
use uuid::Uuid;

fn proof(recipient: &str) -> ProofOfDeliveryRequest {
    ProofOfDeliveryRequest {
        recipient_name: recipient.to_string(),
        notes: None,
        latitude: None,
        longitude: None,
    }
}

fn traffic_jam() -> IssueReportRequest {
    IssueReportRequest {
        issue_type: IssueType::Traffic,
        description: "Accident on the A1 near Karlovac".to_string(),
        estimated_delay_minutes: Some(45),
        latitude: Some(45.49),
        longitude: Some(15.55),
    }
}

#[tokio::test]
async fn creating_a_shipment_computes_its_route() {
    let app = TestApp::new().await;
    let created = app
        .state
        .services
        .shipments
        .create_shipment(shipment_request("TRK-1"))
        .await
        .unwrap();

    assert_eq!(created.shipment.status, ShipmentStatus::Pending);
    let route = created.route.expect("route");
    assert_eq!(route.shipment_id, created.shipment.id);
    assert_eq!(route.status, RouteStatus::Calculated);
    assert!(
        (258.0..=265.0).contains(&route.estimated_distance_km),
        "Zagreb to Split was {} km",
        route.estimated_distance_km
    );
    assert_eq!(
        route.estimated_duration_minutes,
        (route.estimated_distance_km * 1.2) as i32
    );
}

#[tokio::test]
async fn tracking_numbers_are_unique() {
    let app = TestApp::new().await;
    let shipments = &app.state.services.shipments;
    shipments.create_shipment(shipment_request("TRK-1")).await.unwrap();

    let err = shipments
        .create_shipment(shipment_request("TRK-1"))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::DuplicateResource {
            field: "tracking_number",
            ..
        }
    );

    let second = shipments.create_shipment(shipment_request("TRK-2")).await.unwrap();
    let err = shipments
        .update_shipment(second.shipment.id, shipment_request("TRK-1"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::DuplicateResource { .. });
}

#[tokio::test]
async fn missing_coordinates_give_a_zero_estimate() {
    let app = TestApp::new().await;
    let mut request = shipment_request("TRK-1");
    request.destination_latitude = None;

    let created = app
        .state
        .services
        .shipments
        .create_shipment(request)
        .await
        .unwrap();
    let route = created.route.unwrap();
    assert_eq!(route.status, RouteStatus::Calculated);
    assert_eq!(route.estimated_distance_km, 0.0);
    assert_eq!(route.estimated_duration_minutes, 0);
}

#[tokio::test]
async fn update_recomputes_the_route_only_when_coordinates_move() {
    let app = TestApp::new().await;
    let shipments = &app.state.services.shipments;
    let created = shipments.create_shipment(shipment_request("TRK-1")).await.unwrap();
    let id = created.shipment.id;
    let original = created.route.unwrap();

    let mut heavier = shipment_request("TRK-1");
    heavier.weight_kg = 300.0;
    let same_place = shipments.update_shipment(id, heavier).await.unwrap();
    assert_eq!(same_place.shipment.weight_kg, 300.0);
    let route = same_place.route.unwrap();
    assert_eq!(route.id, original.id);
    assert_eq!(route.estimated_distance_km, original.estimated_distance_km);

    let mut to_zagreb = shipment_request("TRK-1");
    to_zagreb.destination_latitude = Some(45.8150);
    to_zagreb.destination_longitude = Some(15.9819);
    let moved = shipments.update_shipment(id, to_zagreb).await.unwrap();
    assert_eq!(moved.route.unwrap().estimated_distance_km, 0.0);
    assert_eq!(moved.shipment.status, ShipmentStatus::Pending);

    assert_matches!(
        shipments
            .update_shipment(Uuid::new_v4(), shipment_request("TRK-9"))
            .await,
        Err(ServiceError::NotFound { .. })
    );
}

#[tokio::test]
async fn update_never_changes_the_delivery_status() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", None).await;
    app.assign(&driver, &vehicle, vec![shipment.id]).await;

    let updated = app
        .state
        .services
        .shipments
        .update_shipment(shipment.id, shipment_request("TRK-1"))
        .await
        .unwrap();
    assert_eq!(updated.shipment.status, ShipmentStatus::Scheduled);
    assert_eq!(updated.shipment.actual_delivery_date, None);
}

#[tokio::test]
async fn delivery_requires_an_assignment_for_this_driver() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let stranger = app.seed_driver("LIC-002").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let unassigned = app.seed_shipment("TRK-1", None).await;
    let assigned = app.seed_shipment("TRK-2", None).await;
    let shipments = &app.state.services.shipments;

    let err = shipments
        .start_delivery(unassigned.id, driver.profile.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(msg) if msg.contains("is not assigned"));

    app.assign(&driver, &vehicle, vec![assigned.id]).await;
    let err = shipments
        .start_delivery(assigned.id, stranger.profile.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(msg) if msg.contains("not assigned to this driver"));

    assert_matches!(
        shipments.start_delivery(Uuid::new_v4(), driver.profile.id).await,
        Err(ServiceError::NotFound { .. })
    );
}

#[rstest]
#[case::still_scheduled(false)]
#[case::already_delivered(true)]
#[tokio::test]
async fn complete_delivery_only_from_in_transit(#[case] deliver_first: bool) {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", None).await;
    let shipments = &app.state.services.shipments;
    let me = driver.profile.id;
    app.assign(&driver, &vehicle, vec![shipment.id]).await;

    if deliver_first {
        shipments.start_delivery(shipment.id, me).await.unwrap();
        shipments
            .complete_delivery(shipment.id, me, proof("Ana"))
            .await
            .unwrap();
    }

    let err = shipments
        .complete_delivery(shipment.id, me, proof("Ana"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn blank_recipient_is_a_validation_error() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", None).await;
    let shipments = &app.state.services.shipments;
    app.assign(&driver, &vehicle, vec![shipment.id]).await;
    shipments.start_delivery(shipment.id, driver.profile.id).await.unwrap();

    let err = shipments
        .complete_delivery(shipment.id, driver.profile.id, proof("   "))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let still = shipments.get_shipment(shipment.id).await.unwrap().shipment;
    assert_eq!(still.status, ShipmentStatus::InTransit);
}

#[tokio::test]
async fn reported_issues_delay_the_shipment_until_resumed() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", None).await;
    let shipments = &app.state.services.shipments;
    let me = driver.profile.id;
    app.assign(&driver, &vehicle, vec![shipment.id]).await;

    assert_matches!(
        shipments.report_issue(shipment.id, me, traffic_jam()).await,
        Err(ServiceError::Conflict(_))
    );

    shipments.start_delivery(shipment.id, me).await.unwrap();
    let delayed = shipments
        .report_issue(shipment.id, me, traffic_jam())
        .await
        .unwrap();
    assert_eq!(delayed.status, ShipmentStatus::Delayed);
    assert_eq!(delayed.issue_type, Some(IssueType::Traffic));
    assert_eq!(delayed.issue_estimated_delay_minutes, Some(45));
    assert_eq!(delayed.issue_reported_at, Some(app.clock_now()));

    assert_matches!(
        shipments.complete_delivery(shipment.id, me, proof("Ana")).await,
        Err(ServiceError::Conflict(_))
    );

    let resumed = shipments.resume_delivery(shipment.id, me).await.unwrap();
    assert_eq!(resumed.status, ShipmentStatus::InTransit);
    assert_matches!(
        shipments.resume_delivery(shipment.id, me).await,
        Err(ServiceError::Conflict(_))
    );

    let delivered = shipments
        .complete_delivery(shipment.id, me, proof("Ana"))
        .await
        .unwrap();
    assert_eq!(delivered.status, ShipmentStatus::Delivered);
    assert_eq!(delivered.delivery_recipient.as_deref(), Some("Ana"));
}

#[tokio::test]
async fn bound_shipments_cannot_be_deleted() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let bound = app.seed_shipment("TRK-1", None).await;
    let free = app.seed_shipment("TRK-2", None).await;
    let shipments = &app.state.services.shipments;
    app.assign(&driver, &vehicle, vec![bound.id]).await;

    assert_matches!(
        shipments.delete_shipment(bound.id).await,
        Err(ServiceError::Conflict(_))
    );

    shipments.delete_shipment(free.id).await.unwrap();
    assert_matches!(
        shipments.get_shipment(free.id).await,
        Err(ServiceError::NotFound { .. })
    );
    assert_matches!(
        shipments.delete_shipment(free.id).await,
        Err(ServiceError::NotFound { .. })
    );
}

#[tokio::test]
async fn canceling_unbinds_the_shipment_and_repoints_the_assignment() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let first = app.seed_shipment("TRK-1", None).await;
    let second = app.seed_shipment("TRK-2", None).await;
    let shipments = &app.state.services.shipments;
    let assignments = &app.state.services.assignments;

    let assignment_id = app
        .assign(&driver, &vehicle, vec![first.id, second.id])
        .await
        .assignment
        .id;

    let canceled = shipments.cancel_shipment(first.id).await.unwrap();
    assert_eq!(canceled.shipment.status, ShipmentStatus::Canceled);
    assert_eq!(canceled.route.map(|r| r.status), Some(RouteStatus::Canceled));

    let details = assignments.get_assignment(assignment_id).await.unwrap();
    assert_eq!(details.shipment_ids, vec![second.id]);
    let second_route = shipments.get_shipment(second.id).await.unwrap().route.unwrap();
    assert_eq!(details.assignment.route_id, Some(second_route.id));

    assert_matches!(
        shipments.cancel_shipment(first.id).await,
        Err(ServiceError::Conflict(_))
    );

    // The canceled shipment is no longer bound and can be removed
    shipments.delete_shipment(first.id).await.unwrap();

    // Canceling the last shipment leaves an assignment that can neither start nor complete
    shipments.cancel_shipment(second.id).await.unwrap();
    let emptied = assignments.get_assignment(assignment_id).await.unwrap();
    assert!(emptied.shipment_ids.is_empty());
    assert_eq!(emptied.assignment.route_id, None);
    assert_matches!(
        assignments.start_assignment(assignment_id, driver.profile.id).await,
        Err(ServiceError::Conflict(msg)) if msg.contains("no shipments")
    );
    assert_matches!(
        assignments.complete_assignment(assignment_id, driver.profile.id).await,
        Err(ServiceError::Conflict(_))
    );
    assert_eq!(
        assignments.get_assignment(assignment_id).await.unwrap().assignment.status,
        AssignmentStatus::Scheduled
    );
}

#[tokio::test]
async fn delivered_shipments_cannot_be_canceled() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", Some(Duration::hours(4))).await;
    let shipments = &app.state.services.shipments;
    let me = driver.profile.id;
    app.assign(&driver, &vehicle, vec![shipment.id]).await;
    shipments.start_delivery(shipment.id, me).await.unwrap();
    shipments
        .complete_delivery(shipment.id, me, proof("Ana"))
        .await
        .unwrap();

    assert_matches!(
        shipments.cancel_shipment(shipment.id).await,
        Err(ServiceError::Conflict(_))
    );
}
