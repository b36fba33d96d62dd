use crate::math::{Point3, Vector3};

use super::Surface;

/// A cylindrical surface in 3D space.
///
/// Defined by a point on the axis, the axis direction and the radius. The
/// natural normal points radially away from the axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    center: Point3,
    radius: f64,
    axis: Vector3,
}

impl Cylinder {
    /// Creates a new cylinder; the axis is normalized.
    #[must_use]
    pub fn new(center: Point3, radius: f64, axis: Vector3) -> Self {
        Self {
            center,
            radius,
            axis: axis.normalize(),
        }
    }

    /// Returns the point on the axis the cylinder was built from.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the unit axis direction.
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    fn radial(&self, p: &Point3) -> Vector3 {
        let d = p - self.center;
        d - self.axis * d.dot(&self.axis)
    }
}

impl Surface for Cylinder {
    fn normal_at(&self, p: &Point3) -> Vector3 {
        let r = self.radial(p);
        let len = r.norm();
        if len > 0.0 {
            r / len
        } else {
            Vector3::zeros()
        }
    }

    fn deviation(&self, p: &Point3) -> f64 {
        (self.radial(p).norm() - self.radius).abs()
    }
}
