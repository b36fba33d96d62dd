mod cylinder;
mod plane;

pub use cylinder::Cylinder;
pub use plane::Plane;

use crate::math::{Point3, Vector3};

/// Trait for the analytic surfaces that carry faces of a swept solid.
pub trait Surface {
    /// Unit normal of the surface at (or nearest to) `p`, in the surface's
    /// natural orientation.
    fn normal_at(&self, p: &Point3) -> Vector3;

    /// Unsigned distance from `p` to the surface.
    fn deviation(&self, p: &Point3) -> f64;
}
