#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use fleet_dispatch::{
    auth::{AuthConfig, AuthService, ROLE_ADMIN, ROLE_DISPATCHER, ROLE_DRIVER},
    clock::{FixedClock, SharedClock},
    config::AppConfig,
    db::{self, DbConfig},
    dto::{AssignmentRequest, DriverRequest, ShipmentRequest, VehicleRequest},
    events::{self, EventSender},
    models::{driver, shipment, vehicle::FuelType, vehicle},
    services::AssignmentDetails,
    AppState,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "fleet_dispatch_test_secret_key_32_chars_min";

pub const ZAGREB: (f64, f64) = (45.8150, 15.9819);
pub const SPLIT: (f64, f64) = (43.5081, 16.4402);

/// Monday morning every test starts from.
pub fn start_of_day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()
}

/// A driver profile together with the account it signs in with.
pub struct SeededDriver {
    pub profile: driver::Model,
    pub user_id: Uuid,
    pub token: String,
}

/// Application state over a fresh in-memory SQLite database with migrations applied.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub clock: FixedClock,
    auth: Arc<AuthService>,
    admin_token: String,
    dispatcher_token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.overdue_check_interval_secs = 0;

        // A single connection keeps the in-memory database alive for the whole test
        let pool = db::establish_connection_with_config(&DbConfig::from(&cfg))
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let clock = FixedClock::at(start_of_day());
        let shared: SharedClock = Arc::new(clock.clone());

        let state = AppState::new(Arc::new(pool), Arc::new(cfg), event_sender, shared);
        let auth = Arc::new(AuthService::new(AuthConfig::new(TEST_SECRET)));

        let admin_token = auth
            .issue_token(Uuid::new_v4(), &[ROLE_ADMIN])
            .expect("admin token");
        let dispatcher_token = auth
            .issue_token(Uuid::new_v4(), &[ROLE_DISPATCHER])
            .expect("dispatcher token");

        let router = fleet_dispatch::app_router(state.clone());

        Self {
            router,
            state,
            clock,
            auth,
            admin_token,
            dispatcher_token,
            _event_task: event_task,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn dispatcher_token(&self) -> &str {
        &self.dispatcher_token
    }

    pub fn token_for(&self, user_id: Uuid, roles: &[&str]) -> String {
        self.auth.issue_token(user_id, roles).expect("issue token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn seed_vehicle(&self, plate: &str) -> vehicle::Model {
        self.state
            .services
            .vehicles
            .create_vehicle(vehicle_request(plate))
            .await
            .expect("seed vehicle")
    }

    pub async fn seed_driver(&self, license: &str) -> SeededDriver {
        let user_id = Uuid::new_v4();
        let profile = self
            .state
            .services
            .drivers
            .create_driver(DriverRequest {
                user_id,
                license_number: license.to_string(),
                license_expiry_date: NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
                phone_number: "+385911234567".to_string(),
                vehicle_id: None,
            })
            .await
            .expect("seed driver");
        let token = self.token_for(user_id, &[ROLE_DRIVER]);
        SeededDriver {
            profile,
            user_id,
            token,
        }
    }

    /// PENDING shipment Zagreb -> Split due `due_in` after the current clock.
    pub async fn seed_shipment(&self, tracking: &str, due_in: Option<Duration>) -> shipment::Model {
        let mut request = shipment_request(tracking);
        request.expected_delivery_date = due_in.map(|d| self.clock_now() + d);
        self.state
            .services
            .shipments
            .create_shipment(request)
            .await
            .expect("seed shipment")
            .shipment
    }

    pub async fn assign(
        &self,
        driver: &SeededDriver,
        vehicle: &vehicle::Model,
        shipment_ids: Vec<Uuid>,
    ) -> AssignmentDetails {
        self.state
            .services
            .assignments
            .create_assignment(assignment_request(
                driver.profile.id,
                vehicle.id,
                shipment_ids,
                self.clock_now(),
            ))
            .await
            .expect("seed assignment")
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        use fleet_dispatch::clock::Clock;
        self.clock.now()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn shipment_request(tracking: &str) -> ShipmentRequest {
    ShipmentRequest {
        tracking_number: tracking.to_string(),
        weight_kg: 120.0,
        volume_m3: 0.8,
        origin_address: "Ilica 1, Zagreb".to_string(),
        origin_latitude: Some(ZAGREB.0),
        origin_longitude: Some(ZAGREB.1),
        destination_address: "Riva 2, Split".to_string(),
        destination_latitude: Some(SPLIT.0),
        destination_longitude: Some(SPLIT.1),
        declared_value: 1500.0,
        expected_delivery_date: None,
    }
}

pub fn vehicle_request(plate: &str) -> VehicleRequest {
    VehicleRequest {
        license_plate: plate.to_string(),
        make: "Iveco".to_string(),
        model_name: "Daily".to_string(),
        model_year: 2021,
        fuel_type: FuelType::Diesel,
        load_capacity_kg: 3500.0,
        current_mileage: 59_500,
        last_service_mileage: 30_000,
        next_service_mileage: 60_000,
        fuel_consumption: Some(9.5),
    }
}

pub fn assignment_request(
    driver_id: Uuid,
    vehicle_id: Uuid,
    shipment_ids: Vec<Uuid>,
    start_time: DateTime<Utc>,
) -> AssignmentRequest {
    AssignmentRequest {
        driver_id,
        vehicle_id,
        shipment_ids,
        start_time,
        end_time: Some(start_time + Duration::hours(8)),
        notes: None,
    }
}

/// Reads a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("body is json")
}
