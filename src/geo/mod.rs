//! Great-circle geometry on WGS84-style latitude/longitude pairs
//!
//! Everything here is pure: no allocation, no I/O, no failure modes.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for all distance calculations
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Length of one degree of arc on a great circle
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

/// A point on the globe in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude in degrees
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Shift this coordinate by `offset` degrees (`x` = latitude, `y` = longitude)
    pub fn offset_degrees(self, offset: DVec2) -> Self {
        Self {
            latitude: self.latitude + offset.x,
            longitude: self.longitude + offset.y,
        }
    }

    /// Both components are finite numbers
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Great-circle distance to another coordinate in meters
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_meters(*self, *other)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Haversine distance between two coordinates in meters
///
/// Symmetric in its arguments and exactly zero for identical inputs.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push h a hair outside [0, 1]
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Convert a distance along a meridian into degrees of latitude
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = Coordinate::new(10.352166718021245, 123.9133411900118);
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coordinate::new(10.352166718021245, 123.9133411900118);
        let b = Coordinate::new(10.324941518519026, 123.93484586106506);
        assert!((distance_meters(a, b) - distance_meters(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_known_distance() {
        // USC Talamban to Parkmall, roughly 3.8 km
        let a = Coordinate::new(10.352166718021245, 123.9133411900118);
        let b = Coordinate::new(10.324941518519026, 123.93484586106506);
        let d = distance_meters(a, b);
        assert!((3_700.0..3_900.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        assert!((distance_meters(a, b) - METERS_PER_DEGREE).abs() < 1e-6);
    }

    #[test]
    fn test_antipodal_points_are_finite() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);
        let d = distance_meters(a, b);
        assert!(d.is_finite());
        assert!((d - EARTH_RADIUS_METERS * std::f64::consts::PI).abs() < 1e-3);
    }

    #[test]
    fn test_meters_to_degrees_round_trip() {
        let deg = meters_to_degrees(50.0);
        assert!((deg * METERS_PER_DEGREE - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_offset_degrees() {
        let p = Coordinate::new(10.0, 123.0).offset_degrees(DVec2::new(0.5, -0.25));
        assert_eq!(p, Coordinate::new(10.5, 122.75));
    }
}
