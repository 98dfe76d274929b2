use serde::{Deserialize, Serialize};

/// The mean Earth radius used for great-circle distances, in km.
pub const EARTH_RADIUS_KM: f64 = 6372.8;

/// A geographic position in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in degrees, in `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, in `[-180, 180]`.
    pub lon: f64,
}

impl Point {
    /// Creates a new point.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Computes the great-circle distance to another point
    /// via the haversine formula, in km.
    pub fn haversine_to(&self, other: &Point) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (0.5 * d_lat).sin().powi(2) + (0.5 * d_lon).sin().powi(2) * lat1.cos() * lat2.cos();
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}
