use super::{Point, Point2d, EARTH_RADIUS_KM};

/// Metres per degree of arc on the reference sphere.
const DEGREE_LENGTH: f64 = EARTH_RADIUS_KM * 1000.0 * std::f64::consts::PI / 180.0;

/// An equirectangular projection pinned to a reference center.
///
/// The projection scales latitudes by the cosine of the center's
/// latitude, which is locally near-isometric at city scale. Plane
/// coordinates are in metres, so projected distances compare directly
/// with speeds in m/s. All plane coordinates in a world share a single
/// projection; re-projecting per query would make plane distances
/// incomparable.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    /// The reference center.
    center: Point,
    /// Cosine of the center latitude.
    lat_scale: f64,
}

impl Projection {
    /// Creates a projection centered on the given point.
    pub fn new(center: Point) -> Self {
        Self {
            center,
            lat_scale: center.lat.to_radians().cos(),
        }
    }

    /// The reference center the projection was pinned to.
    pub fn center(&self) -> Point {
        self.center
    }

    /// Projects a spherical position onto the plane, in metres.
    pub fn to_plane(&self, point: Point) -> Point2d {
        Point2d::new(
            point.lat * self.lat_scale * DEGREE_LENGTH,
            point.lon * DEGREE_LENGTH,
        )
    }

    /// Maps a plane position back onto the sphere.
    pub fn to_sphere(&self, point: Point2d) -> Point {
        Point::new(
            point.x / (self.lat_scale * DEGREE_LENGTH),
            point.y / DEGREE_LENGTH,
        )
    }

    /// Computes the Euclidean distance between two spherical
    /// positions after projection.
    pub fn distance(&self, a: Point, b: Point) -> f64 {
        let a = self.to_plane(a);
        let b = self.to_plane(b);
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn round_trip_within_tolerance() {
        let center = Point::new(52.52, 13.4);
        let proj = Projection::new(center);
        for (lat, lon) in [(52.4, 13.2), (52.6, 13.6), (52.52, 13.4)] {
            let back = proj.to_sphere(proj.to_plane(Point::new(lat, lon)));
            assert_approx_eq!(back.lat, lat, 1e-9);
            assert_approx_eq!(back.lon, lon, 1e-9);
        }
    }

    #[test]
    fn plane_coordinates_are_metres() {
        let proj = Projection::new(Point::new(0.0, 0.0));
        let d = proj.distance(Point::new(0.0, 0.0), Point::new(0.0, 0.001));
        assert_approx_eq!(d, 0.001 * DEGREE_LENGTH, 1e-9);
        // A millidegree of arc is about 111 m.
        assert!(d > 100.0 && d < 120.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let proj = Projection::new(Point::new(48.0, 11.0));
        let a = Point::new(48.1, 11.1);
        let b = Point::new(48.2, 10.9);
        assert_approx_eq!(proj.distance(a, b), proj.distance(b, a), 1e-12);
    }
}
