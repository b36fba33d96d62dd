use crate::math::{Point3, Vector3};

use super::{Curve, CurveDomain};

/// A line segment between two points, parameterized over `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    start: Point3,
    end: Point3,
}

impl Line {
    /// Creates a new line segment.
    #[must_use]
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// Returns the start point.
    #[must_use]
    pub fn start(&self) -> &Point3 {
        &self.start
    }

    /// Returns the end point.
    #[must_use]
    pub fn end(&self) -> &Point3 {
        &self.end
    }

    /// Returns the (unnormalized) direction `end - start`.
    #[must_use]
    pub fn direction(&self) -> Vector3 {
        self.end - self.start
    }

    /// Returns the length of the segment.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.direction().norm()
    }
}

impl Curve for Line {
    fn evaluate(&self, t: f64) -> Point3 {
        self.start + self.direction() * t
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(0.0, 1.0)
    }

    fn is_closed(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::TOLERANCE;

    #[test]
    fn evaluates_endpoints_and_midpoint() {
        let line = Line::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, 0.0));
        let mid = line.evaluate(0.5);
        assert!((mid - Point3::new(1.0, 2.0, 0.0)).norm() < TOLERANCE);
        assert!((line.evaluate(1.0) - *line.end()).norm() < TOLERANCE);
        assert!((line.length() - 20.0_f64.sqrt()).abs() < TOLERANCE);
    }
}
