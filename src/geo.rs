//! Geographic primitives and the plane projection.

use cgmath::Point2;

pub use point::{Point, EARTH_RADIUS_KM};
pub use projection::Projection;
pub use shapes::{Circle, Rect};

mod point;
mod projection;
mod shapes;

/// A 2D point in plane coordinates, in metres.
pub type Point2d = Point2<f64>;

/// A 2D point in single-precision plane coordinates,
/// as stored on traffic graph nodes.
pub type Point2f = Point2<f32>;
