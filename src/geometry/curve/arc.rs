use std::f64::consts::TAU;

use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Curve, CurveDomain};

/// A circular arc in 3D space.
///
/// Points are `center + radius * (cos(t) * ref_dir + sin(t) * binormal)` with
/// `binormal = normal × ref_dir`. The arc runs from `start_angle` to
/// `start_angle + sweep`; a negative sweep runs clockwise about `normal`.
/// A full circle has `|sweep| = 2π`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    center: Point3,
    radius: f64,
    normal: Vector3,
    ref_dir: Vector3,
    start_angle: f64,
    sweep: f64,
}

impl Arc {
    /// Creates a new arc. `normal` and `ref_dir` are expected to be
    /// orthonormal; they are normalized here.
    #[must_use]
    pub fn new(
        center: Point3,
        radius: f64,
        normal: Vector3,
        ref_dir: Vector3,
        start_angle: f64,
        sweep: f64,
    ) -> Self {
        Self {
            center,
            radius,
            normal: normal.normalize(),
            ref_dir: ref_dir.normalize(),
            start_angle,
            sweep,
        }
    }

    /// Returns the center of the arc.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius of the arc.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the normal of the arc plane.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Returns the reference direction for angle zero.
    #[must_use]
    pub fn ref_dir(&self) -> &Vector3 {
        &self.ref_dir
    }

    /// Returns the signed sweep angle in radians.
    #[must_use]
    pub fn sweep(&self) -> f64 {
        self.sweep
    }

    fn binormal(&self) -> Vector3 {
        self.normal.cross(&self.ref_dir)
    }
}

impl Curve for Arc {
    fn evaluate(&self, t: f64) -> Point3 {
        let binormal = self.binormal();
        self.center + self.ref_dir * (self.radius * t.cos()) + binormal * (self.radius * t.sin())
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(self.start_angle, self.start_angle + self.sweep)
    }

    fn is_closed(&self) -> bool {
        (self.sweep.abs() - TAU).abs() < TOLERANCE
    }
}
