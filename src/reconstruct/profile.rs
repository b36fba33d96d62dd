use std::f64::consts::TAU;

use crate::error::ReconstructionError;
use crate::math::polygon_2d::signed_area;
use crate::math::{Point2, Vector2, POINT_TOLERANCE, TOLERANCE};
use crate::sequence::{Curve, Loop, Sketch};

/// Sweeps closer than this to zero are treated as straight lines.
const MIN_SWEEP: f64 = 1e-9;

/// A profile segment in scaled sketch coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Line {
        start: Point2,
        end: Point2,
    },
    /// Arc about `center` from `start_angle` over signed `sweep`
    /// (positive counter-clockwise). A full circle has `|sweep| = 2π`.
    Arc {
        center: Point2,
        radius: f64,
        start_angle: f64,
        sweep: f64,
    },
}

impl Segment {
    /// First point of the segment.
    #[must_use]
    pub fn start(&self) -> Point2 {
        match self {
            Self::Line { start, .. } => *start,
            Self::Arc {
                center,
                radius,
                start_angle,
                ..
            } => polar(center, *radius, *start_angle),
        }
    }

    /// Last point of the segment.
    #[must_use]
    pub fn end(&self) -> Point2 {
        match self {
            Self::Line { end, .. } => *end,
            Self::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => polar(center, *radius, start_angle + sweep),
        }
    }

    /// The same segment traversed backwards.
    #[must_use]
    pub fn reversed(&self) -> Self {
        match self {
            Self::Line { start, end } => Self::Line {
                start: *end,
                end: *start,
            },
            Self::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => Self::Arc {
                center: *center,
                radius: *radius,
                start_angle: start_angle + sweep,
                sweep: -sweep,
            },
        }
    }

    /// Points along the segment, end point excluded. Arcs are sampled with
    /// `per_turn` points per full revolution.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn sample(&self, per_turn: usize, out: &mut Vec<Point2>) {
        match self {
            Self::Line { start, .. } => out.push(*start),
            Self::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => {
                let n = ((sweep.abs() / TAU) * per_turn as f64).ceil().max(2.0) as usize;
                for k in 0..n {
                    let t = start_angle + sweep * (k as f64 / n as f64);
                    out.push(polar(center, *radius, t));
                }
            }
        }
    }
}

fn polar(center: &Point2, radius: f64, angle: f64) -> Point2 {
    center + Vector2::new(angle.cos(), angle.sin()) * radius
}

/// A closed loop of connected segments.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileLoop {
    pub segments: Vec<Segment>,
}

impl ProfileLoop {
    /// Closed polyline approximation used for orientation and overlap checks.
    #[must_use]
    pub fn polyline(&self) -> Vec<Point2> {
        let mut pts = Vec::new();
        for seg in &self.segments {
            seg.sample(64, &mut pts);
        }
        pts
    }

    fn reversed(&self) -> Self {
        Self {
            segments: self.segments.iter().rev().map(Segment::reversed).collect(),
        }
    }
}

/// A planar region: an outer loop (counter-clockwise) and holes (clockwise).
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub loops: Vec<ProfileLoop>,
}

impl Profile {
    /// The outer boundary.
    #[must_use]
    pub fn outer(&self) -> &ProfileLoop {
        &self.loops[0]
    }

    /// The holes.
    #[must_use]
    pub fn holes(&self) -> &[ProfileLoop] {
        &self.loops[1..]
    }

    /// Resolves a sketch into an oriented profile in scaled coordinates.
    ///
    /// Zero-length curves are skipped. The first loop that keeps any curve is
    /// the outer boundary.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError::EmptySketch`] if no curve survives and
    /// [`ReconstructionError::DegenerateProfile`] for loops enclosing no area,
    /// circles mixed with other curves, or arcs whose endpoints cannot lie on
    /// the given sweep.
    pub fn from_sketch(sketch: &Sketch, operation: usize) -> Result<Self, ReconstructionError> {
        let degenerate =
            |reason: String| ReconstructionError::DegenerateProfile { operation, reason };
        if !(sketch.scale.is_finite() && sketch.scale > TOLERANCE) {
            return Err(degenerate(format!("sketch scale {} is not positive", sketch.scale)));
        }

        let mut loops = Vec::new();
        for (index, lp) in sketch.loops.iter().enumerate() {
            let segments = resolve_loop(lp, sketch.scale)
                .map_err(|r| degenerate(format!("loop {index}: {r}")))?;
            if segments.is_empty() {
                continue;
            }
            let mut profile_loop = ProfileLoop { segments };
            let area = signed_area(&profile_loop.polyline());
            if area.abs() < TOLERANCE {
                return Err(degenerate(format!("loop {index} encloses no area")));
            }
            let want_ccw = loops.is_empty();
            if (area > 0.0) != want_ccw {
                profile_loop = profile_loop.reversed();
            }
            loops.push(profile_loop);
        }

        if loops.is_empty() {
            return Err(ReconstructionError::EmptySketch { operation });
        }
        Ok(Self { loops })
    }
}

fn resolve_loop(lp: &Loop, scale: f64) -> Result<Vec<Segment>, String> {
    let has_circle = lp.curves.iter().any(|c| matches!(c, Curve::Circle { .. }));
    if has_circle && lp.curves.len() > 1 {
        return Err("a circle must form a loop on its own".into());
    }

    let mut segments = Vec::with_capacity(lp.curves.len());
    for curve in &lp.curves {
        match curve {
            Curve::Circle { center, radius } => {
                let radius = radius * scale;
                if radius <= POINT_TOLERANCE {
                    return Err("circle radius is zero".into());
                }
                segments.push(Segment::Arc {
                    center: center * scale,
                    radius,
                    start_angle: 0.0,
                    sweep: TAU,
                });
            }
            Curve::Line { start, end } => {
                let (start, end) = (start * scale, end * scale);
                if (end - start).norm() > POINT_TOLERANCE {
                    segments.push(Segment::Line { start, end });
                }
            }
            Curve::Arc {
                start,
                end,
                sweep,
                counter_clockwise,
            } => {
                let (start, end) = (start * scale, end * scale);
                if (end - start).norm() <= POINT_TOLERANCE {
                    continue;
                }
                if sweep.abs() < MIN_SWEEP {
                    segments.push(Segment::Line { start, end });
                } else {
                    segments.push(arc_through(start, end, sweep.abs(), *counter_clockwise)?);
                }
            }
        }
    }
    Ok(segments)
}

/// Builds the arc from `start` to `end` that sweeps `sweep` radians.
fn arc_through(start: Point2, end: Point2, sweep: f64, ccw: bool) -> Result<Segment, String> {
    if sweep >= TAU - MIN_SWEEP {
        return Err(format!("arc with distinct endpoints cannot sweep {sweep} radians"));
    }
    let chord = end - start;
    let c = chord.norm();
    let half = sweep / 2.0;
    let mid = start + chord * 0.5;
    let left = Vector2::new(-chord.y, chord.x) / c;
    // Signed distance from the chord midpoint to the center; negative past a half turn.
    let h = (c / 2.0) / half.tan();
    let center = if ccw { mid + left * h } else { mid - left * h };
    let radius = (c / 2.0) / half.sin();
    let d = start - center;
    let start_angle = d.y.atan2(d.x);
    Ok(Segment::Arc {
        center,
        radius,
        start_angle,
        sweep: if ccw { sweep } else { -sweep },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sequence::SketchPlane;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn sketch(loops: Vec<Vec<Curve>>) -> Sketch {
        Sketch {
            plane: SketchPlane::default(),
            scale: 1.0,
            loops: loops.into_iter().map(|curves| Loop { curves }).collect(),
        }
    }

    fn square(x0: f64, y0: f64, s: f64) -> Vec<Curve> {
        let pts = [p(x0, y0), p(x0 + s, y0), p(x0 + s, y0 + s), p(x0, y0 + s)];
        (0..4)
            .map(|i| Curve::Line {
                start: pts[i],
                end: pts[(i + 1) % 4],
            })
            .collect()
    }

    // ── Arc geometry ───────────────────────────────────────────

    #[test]
    fn quarter_arc_center_ccw() {
        let seg = arc_through(p(1.0, 0.0), p(0.0, 1.0), FRAC_PI_2, true).unwrap();
        let Segment::Arc { center, radius, sweep, .. } = seg.clone() else {
            panic!("expected arc");
        };
        assert!((center - p(0.0, 0.0)).norm() < 1e-12);
        assert_relative_eq!(radius, 1.0, epsilon = 1e-12);
        assert_relative_eq!(sweep, FRAC_PI_2);
        assert!((seg.end() - p(0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn major_arc_center_cw() {
        // Clockwise three-quarter turn from (1,0) to (0,1) about the origin.
        let seg = arc_through(p(1.0, 0.0), p(0.0, 1.0), 1.5 * PI, false).unwrap();
        let Segment::Arc { center, .. } = seg.clone() else {
            panic!("expected arc");
        };
        assert!((center - p(0.0, 0.0)).norm() < 1e-12);
        assert!((seg.end() - p(0.0, 1.0)).norm() < 1e-12);
    }

    // ── Profiles ───────────────────────────────────────────────

    #[test]
    fn outer_ccw_and_hole_cw() {
        let mut outer = square(0.0, 0.0, 4.0);
        outer.reverse();
        let outer: Vec<Curve> = outer
            .into_iter()
            .map(|c| match c {
                Curve::Line { start, end } => Curve::Line { start: end, end: start },
                other => other,
            })
            .collect();
        let s = sketch(vec![outer, square(1.0, 1.0, 1.0)]);
        let profile = Profile::from_sketch(&s, 1).unwrap();
        assert!(signed_area(&profile.outer().polyline()) > 0.0);
        assert!(signed_area(&profile.holes()[0].polyline()) < 0.0);
    }

    #[test]
    fn scale_is_applied() {
        let s = Sketch {
            scale: 2.0,
            ..sketch(vec![square(0.0, 0.0, 1.0)])
        };
        let profile = Profile::from_sketch(&s, 1).unwrap();
        assert_relative_eq!(signed_area(&profile.outer().polyline()), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_length_lines_are_skipped() {
        let mut curves = square(0.0, 0.0, 1.0);
        curves.insert(
            1,
            Curve::Line {
                start: p(1.0, 0.0),
                end: p(1.0, 0.0),
            },
        );
        let profile = Profile::from_sketch(&sketch(vec![curves]), 0).unwrap();
        assert_eq!(profile.outer().segments.len(), 4);
    }

    #[test]
    fn empty_sketch_is_rejected() {
        let err = Profile::from_sketch(&sketch(vec![vec![]]), 3).unwrap_err();
        assert!(matches!(err, ReconstructionError::EmptySketch { operation: 3 }));
    }

    #[test]
    fn collapsed_loop_is_degenerate() {
        let curves = vec![
            Curve::Line { start: p(0.0, 0.0), end: p(1.0, 0.0) },
            Curve::Line { start: p(1.0, 0.0), end: p(0.0, 0.0) },
        ];
        let err = Profile::from_sketch(&sketch(vec![curves]), 0).unwrap_err();
        assert!(matches!(err, ReconstructionError::DegenerateProfile { .. }));
    }

    #[test]
    fn circle_mixed_with_lines_is_degenerate() {
        let mut curves = square(0.0, 0.0, 1.0);
        curves.push(Curve::Circle { center: p(0.5, 0.5), radius: 0.1 });
        let err = Profile::from_sketch(&sketch(vec![curves]), 0).unwrap_err();
        assert!(matches!(err, ReconstructionError::DegenerateProfile { .. }));
    }

    #[test]
    fn circle_profile() {
        let s = sketch(vec![vec![Curve::Circle { center: p(0.0, 0.0), radius: 1.0 }]]);
        let profile = Profile::from_sketch(&s, 0).unwrap();
        let area = signed_area(&profile.outer().polyline());
        assert!(area > 3.0 && area < PI);
    }
}
