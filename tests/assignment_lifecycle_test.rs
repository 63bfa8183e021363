mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{assignment_request, TestApp};
use fleet_dispatch::{
    dto::ProofOfDeliveryRequest,
    errors::ServiceError,
    models::{AssignmentStatus, RouteStatus, ShipmentStatus},
};
use rstest::rstest;
use uuid::Uuid;

fn signed_by(recipient: &str) -> ProofOfDeliveryRequest {
    ProofOfDeliveryRequest {
        recipient_name: recipient.into(),
        notes: None,
        latitude: None,
        longitude: None,
    }
}

#[tokio::test]
async fn creating_an_assignment_schedules_its_shipments() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let first = app.seed_shipment("TRK-1", None).await;
    let second = app.seed_shipment("TRK-2", None).await;

    let details = app.assign(&driver, &vehicle, vec![first.id, second.id]).await;

    assert_eq!(details.assignment.status, AssignmentStatus::Scheduled);
    assert_eq!(details.shipment_ids, vec![first.id, second.id]);

    let shipments = &app.state.services.shipments;
    let first_view = shipments.get_shipment(first.id).await.unwrap();
    let second_view = shipments.get_shipment(second.id).await.unwrap();
    assert_eq!(first_view.shipment.status, ShipmentStatus::Scheduled);
    assert_eq!(second_view.shipment.status, ShipmentStatus::Scheduled);

    let first_route = first_view.route.expect("route computed on create");
    assert_eq!(first_route.status, RouteStatus::Active);
    assert_eq!(details.assignment.route_id, Some(first_route.id));
    assert_eq!(
        second_view.route.map(|r| r.status),
        Some(RouteStatus::Active)
    );
}

#[tokio::test]
async fn a_bound_shipment_cannot_join_a_second_assignment() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let other = app.seed_driver("LIC-002").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", None).await;

    app.assign(&driver, &vehicle, vec![shipment.id]).await;

    let err = app
        .state
        .services
        .assignments
        .create_assignment(assignment_request(
            other.profile.id,
            vehicle.id,
            vec![shipment.id],
            app.clock_now(),
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn create_rejects_malformed_requests() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", None).await;
    let assignments = &app.state.services.assignments;
    let now = app.clock_now();

    let err = assignments
        .create_assignment(assignment_request(
            driver.profile.id,
            vehicle.id,
            vec![shipment.id, shipment.id],
            now,
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    let mut backwards = assignment_request(driver.profile.id, vehicle.id, vec![shipment.id], now);
    backwards.end_time = Some(now - Duration::minutes(1));
    let err = assignments.create_assignment(backwards).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = assignments
        .create_assignment(assignment_request(driver.profile.id, vehicle.id, vec![], now))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = assignments
        .create_assignment(assignment_request(
            Uuid::new_v4(),
            vehicle.id,
            vec![shipment.id],
            now,
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound { entity: "Driver", .. });

    let err = assignments
        .create_assignment(assignment_request(
            driver.profile.id,
            vehicle.id,
            vec![Uuid::new_v4()],
            now,
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound { entity: "Shipment", .. });

    // Nothing was bound by the failed attempts
    let view = app.state.services.shipments.get_shipment(shipment.id).await.unwrap();
    assert_eq!(view.shipment.status, ShipmentStatus::Pending);
}

#[tokio::test]
async fn full_delivery_walkthrough_rejects_out_of_order_and_foreign_steps() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let intruder = app.seed_driver("LIC-002").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", Some(Duration::hours(6))).await;
    let assignments = &app.state.services.assignments;
    let shipments = &app.state.services.shipments;

    let assignment_id = app.assign(&driver, &vehicle, vec![shipment.id]).await.assignment.id;
    let me = driver.profile.id;

    assert_matches!(
        assignments.complete_assignment(assignment_id, me).await,
        Err(ServiceError::Conflict(_))
    );
    assert_matches!(
        assignments.start_assignment(assignment_id, intruder.profile.id).await,
        Err(ServiceError::Forbidden(_))
    );

    let started = assignments.start_assignment(assignment_id, me).await.unwrap();
    assert_eq!(started.assignment.status, AssignmentStatus::InProgress);
    assert_matches!(
        assignments.start_assignment(assignment_id, me).await,
        Err(ServiceError::Conflict(_))
    );

    assert_matches!(
        shipments.start_delivery(shipment.id, intruder.profile.id).await,
        Err(ServiceError::Conflict(_))
    );
    let in_transit = shipments.start_delivery(shipment.id, me).await.unwrap();
    assert_eq!(in_transit.status, ShipmentStatus::InTransit);
    assert_matches!(
        shipments.start_delivery(shipment.id, me).await,
        Err(ServiceError::Conflict(_))
    );

    // Undelivered shipments block completion
    assert_matches!(
        assignments.complete_assignment(assignment_id, me).await,
        Err(ServiceError::Conflict(_))
    );

    app.clock.advance(Duration::hours(2));
    let delivered = shipments
        .complete_delivery(
            shipment.id,
            me,
            fleet_dispatch::dto::ProofOfDeliveryRequest {
                recipient_name: "Ana Horvat".into(),
                notes: Some("Left at reception".into()),
                latitude: Some(43.5081),
                longitude: Some(16.4402),
            },
        )
        .await
        .unwrap();
    assert_eq!(delivered.status, ShipmentStatus::Delivered);
    assert_eq!(delivered.actual_delivery_date, Some(app.clock_now()));

    assert_matches!(
        assignments.complete_assignment(assignment_id, intruder.profile.id).await,
        Err(ServiceError::Forbidden(_))
    );
    let completed = assignments.complete_assignment(assignment_id, me).await.unwrap();
    assert_eq!(completed.assignment.status, AssignmentStatus::Completed);
    assert_eq!(completed.assignment.end_time, Some(app.clock_now()));

    let route = shipments.get_shipment(shipment.id).await.unwrap().route.unwrap();
    assert_eq!(route.status, RouteStatus::Completed);
}

#[tokio::test]
async fn deleting_an_assignment_releases_its_shipments() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", None).await;
    let assignments = &app.state.services.assignments;

    let assignment_id = app.assign(&driver, &vehicle, vec![shipment.id]).await.assignment.id;
    assignments.delete_assignment(assignment_id).await.unwrap();

    let view = app.state.services.shipments.get_shipment(shipment.id).await.unwrap();
    assert_eq!(view.shipment.status, ShipmentStatus::Pending);
    assert_eq!(view.route.map(|r| r.status), Some(RouteStatus::Calculated));
    assert_matches!(
        assignments.get_assignment(assignment_id).await,
        Err(ServiceError::NotFound { .. })
    );

    // Unbound again, so it can be assigned anew
    let again = app.assign(&driver, &vehicle, vec![shipment.id]).await;
    assert_eq!(again.shipment_ids, vec![shipment.id]);

    assert_matches!(
        assignments.delete_assignment(Uuid::new_v4()).await,
        Err(ServiceError::NotFound { .. })
    );
}

#[tokio::test]
async fn deleting_an_assignment_keeps_delivered_shipments_delivered() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let done = app.seed_shipment("TRK-1", None).await;
    let moving = app.seed_shipment("TRK-2", None).await;
    let shipments = &app.state.services.shipments;
    let me = driver.profile.id;

    let assignment_id = app
        .assign(&driver, &vehicle, vec![done.id, moving.id])
        .await
        .assignment
        .id;
    shipments.start_delivery(done.id, me).await.unwrap();
    shipments
        .complete_delivery(
            done.id,
            me,
            fleet_dispatch::dto::ProofOfDeliveryRequest {
                recipient_name: "Ivo".into(),
                notes: None,
                latitude: None,
                longitude: None,
            },
        )
        .await
        .unwrap();
    shipments.start_delivery(moving.id, me).await.unwrap();

    app.state
        .services
        .assignments
        .delete_assignment(assignment_id)
        .await
        .unwrap();

    let done = shipments.get_shipment(done.id).await.unwrap().shipment;
    let moving = shipments.get_shipment(moving.id).await.unwrap().shipment;
    assert_eq!(done.status, ShipmentStatus::Delivered);
    assert_eq!(moving.status, ShipmentStatus::Pending);
}

#[tokio::test]
async fn updating_an_assignment_rebinds_shipments() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let other_vehicle = app.seed_vehicle("ST-2002-BB").await;
    let kept = app.seed_shipment("TRK-1", None).await;
    let dropped = app.seed_shipment("TRK-2", None).await;
    let added = app.seed_shipment("TRK-3", None).await;
    let assignments = &app.state.services.assignments;
    let shipments = &app.state.services.shipments;

    let assignment_id = app
        .assign(&driver, &vehicle, vec![kept.id, dropped.id])
        .await
        .assignment
        .id;

    let updated = assignments
        .update_assignment(
            assignment_id,
            assignment_request(
                driver.profile.id,
                other_vehicle.id,
                vec![added.id, kept.id],
                app.clock_now() + Duration::hours(1),
            ),
        )
        .await
        .unwrap();

    assert_eq!(updated.shipment_ids, vec![added.id, kept.id]);
    assert_eq!(updated.assignment.vehicle_id, other_vehicle.id);
    assert_eq!(updated.assignment.status, AssignmentStatus::Scheduled);

    let added_view = shipments.get_shipment(added.id).await.unwrap();
    assert_eq!(added_view.shipment.status, ShipmentStatus::Scheduled);
    assert_eq!(
        updated.assignment.route_id,
        added_view.route.as_ref().map(|r| r.id)
    );

    let dropped_view = shipments.get_shipment(dropped.id).await.unwrap();
    assert_eq!(dropped_view.shipment.status, ShipmentStatus::Pending);
    assert_eq!(
        dropped_view.route.map(|r| r.status),
        Some(RouteStatus::Calculated)
    );

    let kept_view = shipments.get_shipment(kept.id).await.unwrap();
    assert_eq!(kept_view.shipment.status, ShipmentStatus::Scheduled);
}

#[tokio::test]
async fn releasing_a_shipment_already_in_transit_is_rejected() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let moving = app.seed_shipment("TRK-1", None).await;
    let waiting = app.seed_shipment("TRK-2", None).await;

    let assignment_id = app
        .assign(&driver, &vehicle, vec![moving.id, waiting.id])
        .await
        .assignment
        .id;
    app.state
        .services
        .shipments
        .start_delivery(moving.id, driver.profile.id)
        .await
        .unwrap();

    let err = app
        .state
        .services
        .assignments
        .update_assignment(
            assignment_id,
            assignment_request(
                driver.profile.id,
                vehicle.id,
                vec![waiting.id],
                app.clock_now(),
            ),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn completed_assignments_cannot_be_updated() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", None).await;
    let assignments = &app.state.services.assignments;
    let shipments = &app.state.services.shipments;
    let me = driver.profile.id;

    let assignment_id = app.assign(&driver, &vehicle, vec![shipment.id]).await.assignment.id;
    assignments.start_assignment(assignment_id, me).await.unwrap();
    shipments.start_delivery(shipment.id, me).await.unwrap();
    shipments
        .complete_delivery(
            shipment.id,
            me,
            fleet_dispatch::dto::ProofOfDeliveryRequest {
                recipient_name: "Ana".into(),
                notes: None,
                latitude: None,
                longitude: None,
            },
        )
        .await
        .unwrap();
    assignments.complete_assignment(assignment_id, me).await.unwrap();

    let err = assignments
        .update_assignment(
            assignment_id,
            assignment_request(me, vehicle.id, vec![shipment.id], app.clock_now()),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn driver_schedule_lists_active_assignments_in_creation_order() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let other = app.seed_driver("LIC-002").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let a = app.seed_shipment("TRK-1", None).await;
    let b = app.seed_shipment("TRK-2", None).await;
    let c = app.seed_shipment("TRK-3", None).await;

    let first = app.assign(&driver, &vehicle, vec![a.id]).await.assignment.id;
    app.clock.advance(Duration::minutes(5));
    let second = app.assign(&driver, &vehicle, vec![b.id]).await.assignment.id;
    app.clock.advance(Duration::minutes(5));
    app.assign(&other, &vehicle, vec![c.id]).await;

    let schedule = app
        .state
        .services
        .assignments
        .find_by_driver(driver.profile.id)
        .await
        .unwrap();

    let ids: Vec<Uuid> = schedule.iter().map(|d| d.assignment.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert_eq!(schedule[0].shipment_ids, vec![a.id]);

    let empty = app
        .state
        .services
        .assignments
        .find_by_driver(Uuid::new_v4())
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn an_assignment_emptied_by_cancellation_cannot_start() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", None).await;
    let assignments = &app.state.services.assignments;
    let me = driver.profile.id;

    let assignment_id = app.assign(&driver, &vehicle, vec![shipment.id]).await.assignment.id;
    app.state
        .services
        .shipments
        .cancel_shipment(shipment.id)
        .await
        .unwrap();

    assert_matches!(
        assignments.start_assignment(assignment_id, me).await,
        Err(ServiceError::Conflict(_))
    );
    let details = assignments.get_assignment(assignment_id).await.unwrap();
    assert_eq!(details.assignment.status, AssignmentStatus::Scheduled);
}

#[tokio::test]
async fn an_assignment_emptied_in_progress_cannot_complete() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", None).await;
    let assignments = &app.state.services.assignments;
    let me = driver.profile.id;

    let assignment_id = app.assign(&driver, &vehicle, vec![shipment.id]).await.assignment.id;
    assignments.start_assignment(assignment_id, me).await.unwrap();
    app.state
        .services
        .shipments
        .cancel_shipment(shipment.id)
        .await
        .unwrap();

    assert_matches!(
        assignments.complete_assignment(assignment_id, me).await,
        Err(ServiceError::Conflict(msg)) if msg.contains("no shipments")
    );
    let details = assignments.get_assignment(assignment_id).await.unwrap();
    assert_eq!(details.assignment.status, AssignmentStatus::InProgress);
    assert_eq!(details.assignment.end_time, None);
}

#[rstest]
#[case::scheduled(AssignmentStatus::Scheduled)]
#[case::in_progress(AssignmentStatus::InProgress)]
#[case::completed(AssignmentStatus::Completed)]
#[tokio::test]
async fn other_drivers_are_refused_whatever_the_status(#[case] status: AssignmentStatus) {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let intruder = app.seed_driver("LIC-002").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let shipment = app.seed_shipment("TRK-1", None).await;
    let assignments = &app.state.services.assignments;
    let shipments = &app.state.services.shipments;
    let me = driver.profile.id;

    let assignment_id = app.assign(&driver, &vehicle, vec![shipment.id]).await.assignment.id;
    if status != AssignmentStatus::Scheduled {
        assignments.start_assignment(assignment_id, me).await.unwrap();
    }
    if status == AssignmentStatus::Completed {
        shipments.start_delivery(shipment.id, me).await.unwrap();
        shipments
            .complete_delivery(shipment.id, me, signed_by("Ana"))
            .await
            .unwrap();
        assignments.complete_assignment(assignment_id, me).await.unwrap();
    }

    assert_matches!(
        assignments.start_assignment(assignment_id, intruder.profile.id).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        assignments.complete_assignment(assignment_id, intruder.profile.id).await,
        Err(ServiceError::Forbidden(_))
    );

    let details = assignments.get_assignment(assignment_id).await.unwrap();
    assert_eq!(details.assignment.status, status);
}
