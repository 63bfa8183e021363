//! Straight-line route estimation.
//!
//! Distance is the great-circle distance between origin and destination; the
//! duration is a flat 1.2 minutes per kilometre, not a routed travel time.

use crate::models::RouteStatus;
use serde::Serialize;

const EARTH_RADIUS_KM: f64 = 6371.0;
const MINUTES_PER_KM: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_minutes: i32,
    pub status: RouteStatus,
}

impl RouteEstimate {
    const UNKNOWN: RouteEstimate = RouteEstimate {
        distance_km: 0.0,
        duration_minutes: 0,
        status: RouteStatus::Calculated,
    };
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds a point only when both halves are known.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        Some(Self::new(latitude?, longitude?))
    }
}

fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let (lat1, lon1) = (from.latitude.to_radians(), from.longitude.to_radians());
    let (lat2, lon2) = (to.latitude.to_radians(), to.longitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Estimates distance and duration between two optional points.
///
/// A missing coordinate yields a zero estimate; the caller still records the addresses.
pub fn estimate(origin: Option<GeoPoint>, destination: Option<GeoPoint>) -> RouteEstimate {
    let (Some(origin), Some(destination)) = (origin, destination) else {
        return RouteEstimate::UNKNOWN;
    };

    let distance_km = round2(haversine_km(origin, destination));
    RouteEstimate {
        distance_km,
        duration_minutes: (distance_km * MINUTES_PER_KM) as i32,
        status: RouteStatus::Calculated,
    }
}

/// Same as [`estimate`], taking the four nullable columns as stored on a shipment.
pub fn estimate_coordinates(
    origin_latitude: Option<f64>,
    origin_longitude: Option<f64>,
    destination_latitude: Option<f64>,
    destination_longitude: Option<f64>,
) -> RouteEstimate {
    estimate(
        GeoPoint::from_parts(origin_latitude, origin_longitude),
        GeoPoint::from_parts(destination_latitude, destination_longitude),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ZAGREB: GeoPoint = GeoPoint {
        latitude: 45.8150,
        longitude: 15.9819,
    };
    const SPLIT: GeoPoint = GeoPoint {
        latitude: 43.5081,
        longitude: 16.4402,
    };

    #[test]
    fn zagreb_to_split_is_in_sanity_range() {
        let est = estimate(Some(ZAGREB), Some(SPLIT));
        assert!(
            (258.0..=265.0).contains(&est.distance_km),
            "got {}",
            est.distance_km
        );
        assert_eq!(est.duration_minutes, (est.distance_km * 1.2) as i32);
        assert_eq!(est.status, RouteStatus::Calculated);
    }

    #[test]
    fn missing_coordinates_yield_zero() {
        let est = estimate_coordinates(Some(45.8), None, Some(43.5), Some(16.4));
        assert_eq!(est, RouteEstimate::UNKNOWN);
        assert_eq!(estimate(None, Some(SPLIT)).distance_km, 0.0);
    }

    #[test]
    fn same_point_is_zero() {
        let est = estimate(Some(ZAGREB), Some(ZAGREB));
        assert_eq!(est.distance_km, 0.0);
        assert_eq!(est.duration_minutes, 0);
    }

    #[test]
    fn distance_is_rounded_to_two_decimals() {
        let est = estimate(Some(ZAGREB), Some(SPLIT));
        assert_eq!(est.distance_km, (est.distance_km * 100.0).round() / 100.0);
    }

    proptest! {
        #[test]
        fn estimate_is_symmetric(
            lat1 in -90.0f64..90.0,
            lon1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0,
            lon2 in -180.0f64..180.0,
        ) {
            let a = GeoPoint::new(lat1, lon1);
            let b = GeoPoint::new(lat2, lon2);
            prop_assert_eq!(estimate(Some(a), Some(b)), estimate(Some(b), Some(a)));
        }

        #[test]
        fn estimate_is_bounded_by_half_circumference(
            lat1 in -90.0f64..90.0,
            lon1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0,
            lon2 in -180.0f64..180.0,
        ) {
            let est = estimate(Some(GeoPoint::new(lat1, lon1)), Some(GeoPoint::new(lat2, lon2)));
            prop_assert!(est.distance_km >= 0.0);
            prop_assert!(est.distance_km <= 20_015.09);
        }
    }
}
