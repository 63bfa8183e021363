mod common;

use chrono::Duration;
use common::TestApp;
use fleet_dispatch::{dto::ProofOfDeliveryRequest, models::ShipmentStatus};
use uuid::Uuid;

async fn status_of(app: &TestApp, id: Uuid) -> ShipmentStatus {
    app.state
        .services
        .shipments
        .get_shipment(id)
        .await
        .unwrap()
        .shipment
        .status
}

#[tokio::test]
async fn expired_open_shipments_are_marked_once() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let pending = app.seed_shipment("TRK-1", Some(Duration::hours(1))).await;
    let scheduled = app.seed_shipment("TRK-2", Some(Duration::hours(1))).await;
    let moving = app.seed_shipment("TRK-3", Some(Duration::hours(1))).await;
    app.assign(&driver, &vehicle, vec![scheduled.id, moving.id]).await;
    app.state
        .services
        .shipments
        .start_delivery(moving.id, driver.profile.id)
        .await
        .unwrap();

    app.clock.advance(Duration::hours(2));
    let reconciler = &app.state.services.overdue;

    assert_eq!(reconciler.mark_overdue().await.unwrap(), 3);
    for id in [pending.id, scheduled.id, moving.id] {
        assert_eq!(status_of(&app, id).await, ShipmentStatus::Overdue);
    }

    assert_eq!(reconciler.mark_overdue().await.unwrap(), 0);
}

#[tokio::test]
async fn nothing_is_overdue_before_the_deadline() {
    let app = TestApp::new().await;
    let due = app.seed_shipment("TRK-1", Some(Duration::hours(1))).await;
    let undated = app.seed_shipment("TRK-2", None).await;

    app.clock.advance(Duration::minutes(59));
    assert_eq!(app.state.services.overdue.mark_overdue().await.unwrap(), 0);

    app.clock.advance(Duration::days(30));
    assert_eq!(app.state.services.overdue.mark_overdue().await.unwrap(), 1);
    assert_eq!(status_of(&app, due.id).await, ShipmentStatus::Overdue);
    assert_eq!(status_of(&app, undated.id).await, ShipmentStatus::Pending);
}

#[tokio::test]
async fn finished_shipments_are_left_alone() {
    let app = TestApp::new().await;
    let driver = app.seed_driver("LIC-001").await;
    let vehicle = app.seed_vehicle("ZG-1001-AA").await;
    let delivered = app.seed_shipment("TRK-1", Some(Duration::hours(1))).await;
    let canceled = app.seed_shipment("TRK-2", Some(Duration::hours(1))).await;
    let shipments = &app.state.services.shipments;

    app.assign(&driver, &vehicle, vec![delivered.id]).await;
    shipments
        .start_delivery(delivered.id, driver.profile.id)
        .await
        .unwrap();
    shipments
        .complete_delivery(
            delivered.id,
            driver.profile.id,
            ProofOfDeliveryRequest {
                recipient_name: "Ivana Horvat".into(),
                notes: Some("Left at reception".into()),
                latitude: None,
                longitude: None,
            },
        )
        .await
        .unwrap();
    shipments.cancel_shipment(canceled.id).await.unwrap();

    app.clock.advance(Duration::hours(6));
    assert_eq!(app.state.services.overdue.mark_overdue().await.unwrap(), 0);
    assert_eq!(status_of(&app, delivered.id).await, ShipmentStatus::Delivered);
    assert_eq!(status_of(&app, canceled.id).await, ShipmentStatus::Canceled);
}

#[tokio::test]
async fn overdue_shipments_keep_their_updated_at_from_the_run() {
    let app = TestApp::new().await;
    let shipment = app.seed_shipment("TRK-1", Some(Duration::hours(1))).await;

    app.clock.advance(Duration::hours(3));
    let run_at = app.clock_now();
    app.state.services.overdue.mark_overdue().await.unwrap();

    app.clock.advance(Duration::hours(3));
    app.state.services.overdue.mark_overdue().await.unwrap();

    let stored = app
        .state
        .services
        .shipments
        .get_shipment(shipment.id)
        .await
        .unwrap()
        .shipment;
    assert_eq!(stored.updated_at, run_at);
}
