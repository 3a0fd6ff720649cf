use cgmath::InnerSpace;

use crate::bounds::Bounds;
use crate::math::Vec3;

/// A bounding sphere, used to classify a face against a plane without
/// touching its points when it is far from the plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub origin: Vec3,
    pub radius: f64,
}

impl Default for Sphere {
    fn default() -> Self {
        Sphere::new(Vec3::new(0.0, 0.0, 0.0), 0.0)
    }
}

impl Sphere {
    pub fn new(origin: Vec3, radius: f64) -> Sphere {
        Sphere { origin, radius }
    }

    /// Compute a bounding sphere from an array of points, centred on their bounding box.
    pub fn from_points(points: &[Vec3]) -> Sphere {
        if points.is_empty() {
            return Sphere::default();
        }
        let origin = Bounds::from_points(points).center();
        let max_distance_squared = points
            .iter()
            .map(|point| (point - origin).magnitude2())
            .fold(0.0, f64::max);
        Sphere::new(origin, max_distance_squared.sqrt())
    }
}
