use super::Point;

/// An axis-aligned rectangle in (lat, lon) space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    /// The southern edge.
    pub lower_lat: f64,
    /// The northern edge.
    pub upper_lat: f64,
    /// The western edge.
    pub lower_lon: f64,
    /// The eastern edge.
    pub upper_lon: f64,
}

impl Rect {
    /// Creates a rectangle from its four borders.
    pub fn from_borders(lower_lat: f64, upper_lat: f64, lower_lon: f64, upper_lon: f64) -> Self {
        Self {
            lower_lat,
            upper_lat,
            lower_lon,
            upper_lon,
        }
    }

    /// Creates a rectangle from a center point and two half-extents.
    pub fn from_center(center: Point, lat_radius: f64, lon_radius: f64) -> Self {
        Self {
            lower_lat: center.lat - lat_radius,
            upper_lat: center.lat + lat_radius,
            lower_lon: center.lon - lon_radius,
            upper_lon: center.lon + lon_radius,
        }
    }

    /// Creates the tight bounding rectangle of a circle.
    pub fn from_circle(circle: &Circle) -> Self {
        Self::from_center(circle.center, circle.lat_radius, circle.lon_radius)
    }

    /// Returns true if the point lies within the rectangle.
    pub fn contains(&self, point: Point) -> bool {
        point.lat >= self.lower_lat
            && point.lat <= self.upper_lat
            && point.lon >= self.lower_lon
            && point.lon <= self.upper_lon
    }

    /// Scales the rectangle about its center.
    pub fn scale(&self, factor: f64) -> Self {
        let center = self.center();
        Self::from_center(
            center,
            0.5 * factor * (self.upper_lat - self.lower_lat),
            0.5 * factor * (self.upper_lon - self.lower_lon),
        )
    }

    /// The center of the rectangle.
    pub fn center(&self) -> Point {
        Point::new(
            0.5 * (self.lower_lat + self.upper_lat),
            0.5 * (self.lower_lon + self.upper_lon),
        )
    }

    /// Extends the rectangle to include the given point.
    pub fn extend(&mut self, point: Point) {
        self.lower_lat = self.lower_lat.min(point.lat);
        self.upper_lat = self.upper_lat.max(point.lat);
        self.lower_lon = self.lower_lon.min(point.lon);
        self.upper_lon = self.upper_lon.max(point.lon);
    }

    /// Returns true if `other` lies entirely within this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.lower_lat >= self.lower_lat
            && other.upper_lat <= self.upper_lat
            && other.lower_lon >= self.lower_lon
            && other.upper_lon <= self.upper_lon
    }
}

/// An ellipse in (lat, lon) space with independent radii per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    /// The center of the circle.
    pub center: Point,
    /// The radius along the latitude axis, in degrees.
    pub lat_radius: f64,
    /// The radius along the longitude axis, in degrees.
    pub lon_radius: f64,
}

impl Circle {
    /// Creates a new circle.
    pub fn new(center: Point, lat_radius: f64, lon_radius: f64) -> Self {
        Self {
            center,
            lat_radius,
            lon_radius,
        }
    }

    /// Returns true if the point lies within the circle,
    /// via the axis-aligned ellipse test.
    pub fn contains(&self, point: Point) -> bool {
        let dlat = (point.lat - self.center.lat) / self.lat_radius;
        let dlon = (point.lon - self.center.lon) / self.lon_radius;
        dlat * dlat + dlon * dlon <= 1.0
    }
}
