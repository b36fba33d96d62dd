use crate::math::{Point2, Point3, Vector3};

/// A right-handed coordinate system placed in 3D space.
///
/// Sketch profiles live in the frame's `(x, y)` plane and are extruded
/// along its normal.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Origin of the frame.
    pub origin: Point3,
    /// Unit x axis.
    pub x_axis: Vector3,
    /// Unit y axis (`normal × x_axis`).
    pub y_axis: Vector3,
    /// Unit normal (`x_axis × y_axis`).
    pub normal: Vector3,
}

impl Frame {
    /// The world XY frame at the origin.
    #[must_use]
    pub fn world() -> Self {
        Self {
            origin: Point3::origin(),
            x_axis: Vector3::x(),
            y_axis: Vector3::y(),
            normal: Vector3::z(),
        }
    }

    /// Builds a frame from polar orientation angles.
    ///
    /// The normal is the unit vector at polar angle `theta` and azimuth
    /// `phi`. The reference x axis is the world x axis rotated by `theta`
    /// about y and then by `phi` about z; the final x axis is that
    /// reference rotated by `gamma` about the normal.
    #[must_use]
    pub fn from_angles(origin: Point3, theta: f64, phi: f64, gamma: f64) -> Self {
        let (st, ct) = theta.sin_cos();
        let (sp, cp) = phi.sin_cos();
        let normal = Vector3::new(st * cp, st * sp, ct);
        let ref_x = Vector3::new(ct * cp, ct * sp, -st);
        let ref_y = normal.cross(&ref_x);
        let (sg, cg) = gamma.sin_cos();
        let x_axis = (ref_x * cg + ref_y * sg).normalize();
        let y_axis = normal.cross(&x_axis);
        Self {
            origin,
            x_axis,
            y_axis,
            normal,
        }
    }

    /// Maps a point of the frame's plane, raised by `offset` along the
    /// normal, into world coordinates.
    #[must_use]
    pub fn to_world(&self, p: &Point2, offset: f64) -> Point3 {
        self.origin + self.x_axis * p.x + self.y_axis * p.y + self.normal * offset
    }

    /// Expresses a world point in the frame's planar coordinates.
    #[must_use]
    pub fn to_local(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(d.dot(&self.x_axis), d.dot(&self.y_axis))
    }
}
