mod arc;
mod line;

pub use arc::Arc;
pub use line::Line;

use crate::math::Point3;

/// Parameter domain for a curve.
///
/// `t_max` may be smaller than `t_min` for curves traversed in the
/// negative parameter direction (clockwise arcs).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveDomain {
    /// Start of the parameter range.
    pub t_min: f64,
    /// End of the parameter range.
    pub t_max: f64,
}

impl CurveDomain {
    /// Creates a new curve domain.
    #[must_use]
    pub fn new(t_min: f64, t_max: f64) -> Self {
        Self { t_min, t_max }
    }

    /// Parameter at fraction `s` in `[0, 1]` of the domain.
    #[must_use]
    pub fn lerp(&self, s: f64) -> f64 {
        self.t_min + (self.t_max - self.t_min) * s
    }
}

/// Trait for parametric edge curves in 3D space.
pub trait Curve {
    /// Evaluates the curve at parameter `t`.
    fn evaluate(&self, t: f64) -> Point3;

    /// Returns the parameter domain of the curve.
    fn domain(&self) -> CurveDomain;

    /// Returns whether the curve starts and ends at the same point.
    fn is_closed(&self) -> bool;
}
