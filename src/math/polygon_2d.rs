use super::{Point2, TOLERANCE};

/// Computes the signed area of a closed polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Even-odd point-in-polygon test. Points on the boundary may go either way.
#[must_use]
pub fn point_in_polygon(point: &Point2, polygon: &[Point2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (&polygon[i], &polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = pj.x + (point.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Returns `true` if segments `a0-a1` and `b0-b1` cross at a point interior
/// to both. Touching endpoints and collinear overlaps are not reported.
#[must_use]
pub fn segments_cross(a0: &Point2, a1: &Point2, b0: &Point2, b1: &Point2, tol: f64) -> bool {
    let d1 = orient(b0, b1, a0);
    let d2 = orient(b0, b1, a1);
    let d3 = orient(a0, a1, b0);
    let d4 = orient(a0, a1, b1);
    ((d1 > tol && d2 < -tol) || (d1 < -tol && d2 > tol))
        && ((d3 > tol && d4 < -tol) || (d3 < -tol && d4 > tol))
}

/// Twice the signed area of triangle `a, b, c`.
#[must_use]
pub fn orient(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Checks whether a closed polyline crosses itself.
///
/// Adjacent segments share an endpoint and are skipped.
#[must_use]
pub fn is_self_intersecting(points: &[Point2]) -> bool {
    let n = points.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let (a0, a1) = (&points[i], &points[(i + 1) % n]);
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (b0, b1) = (&points[j], &points[(j + 1) % n]);
            if segments_cross(a0, a1, b0, b1, TOLERANCE) {
                return true;
            }
        }
    }
    false
}

/// Checks whether any segment of one closed polyline crosses the other.
#[must_use]
pub fn polylines_cross(a: &[Point2], b: &[Point2]) -> bool {
    for i in 0..a.len() {
        let (a0, a1) = (&a[i], &a[(i + 1) % a.len()]);
        for j in 0..b.len() {
            let (b0, b1) = (&b[j], &b[(j + 1) % b.len()]);
            if segments_cross(a0, a1, b0, b1, TOLERANCE) {
                return true;
            }
        }
    }
    false
}
