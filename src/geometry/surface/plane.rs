use crate::math::{Point2, Point3, Vector3};

use super::Surface;

/// An infinite plane in 3D space.
///
/// Defined by an origin and two orthonormal direction vectors (`u_dir`,
/// `v_dir`). The normal is `u_dir × v_dir`.
///
/// Parametric form: `P(u, v) = origin + u * u_dir + v * v_dir`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    origin: Point3,
    u_dir: Vector3,
    v_dir: Vector3,
    normal: Vector3,
}

impl Plane {
    /// Creates a plane from an origin and two orthogonal directions.
    #[must_use]
    pub fn new(origin: Point3, u_dir: Vector3, v_dir: Vector3) -> Self {
        let u_dir = u_dir.normalize();
        let v_dir = v_dir.normalize();
        let normal = u_dir.cross(&v_dir).normalize();
        Self {
            origin,
            u_dir,
            v_dir,
            normal,
        }
    }

    /// Creates a plane through `origin` with the given normal.
    ///
    /// The U and V directions are derived from a reference axis that is not
    /// parallel to the normal.
    #[must_use]
    pub fn from_normal(origin: Point3, normal: Vector3) -> Self {
        let normal = normal.normalize();
        let reference = if normal.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let v_dir = normal.cross(&reference).normalize();
        let u_dir = v_dir.cross(&normal);
        Self {
            origin,
            u_dir,
            v_dir,
            normal,
        }
    }

    /// Returns the origin of the plane.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the U direction.
    #[must_use]
    pub fn u_dir(&self) -> &Vector3 {
        &self.u_dir
    }

    /// Returns the V direction.
    #[must_use]
    pub fn v_dir(&self) -> &Vector3 {
        &self.v_dir
    }

    /// Returns the unit normal.
    #[must_use]
    pub fn plane_normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Signed distance from `p` to the plane along the normal.
    #[must_use]
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(&self.normal)
    }

    /// Projects `p` into the plane's `(u, v)` coordinates.
    #[must_use]
    pub fn project(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(d.dot(&self.u_dir), d.dot(&self.v_dir))
    }
}

impl Surface for Plane {
    fn normal_at(&self, _p: &Point3) -> Vector3 {
        self.normal
    }

    fn deviation(&self, p: &Point3) -> f64 {
        self.signed_distance(p).abs()
    }
}
