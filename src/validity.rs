//! Soundness checks on reconstructed solids.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::error::{Error, Result};
use crate::math::polygon_2d::{is_self_intersecting, point_in_polygon, polylines_cross};
use crate::math::{POINT_TOLERANCE, VOLUME_TOLERANCE};
use crate::operations::query::IsValid;
use crate::reconstruct::{Profile, Solid};
use crate::tessellation::TriangleMesh;

/// A single defect found by the checker.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidityIssue {
    #[error("wire is not a closed chain of edges")]
    OpenWire,

    #[error("edge used {forward} time(s) forward and {backward} time(s) backward")]
    UnpairedEdge { forward: usize, backward: usize },

    #[error("planar face deviates from its plane by {0:e}")]
    NonPlanarFace(f64),

    #[error("profile loop {0} crosses itself")]
    SelfIntersectingLoop(usize),

    #[error("profile loops {0} and {1} cross")]
    CrossingLoops(usize, usize),

    #[error("hole {0} lies outside the outer loop")]
    HoleOutsideOuter(usize),

    #[error("enclosed volume {0:e} is not positive")]
    NonPositiveVolume(f64),

    #[error("mesh has {0} boundary edge(s)")]
    OpenMesh(usize),

    #[error("{0} mesh edge(s) are shared by more than two triangles")]
    NonManifoldMesh(usize),

    #[error("{0} mesh edge(s) are traversed twice in the same direction")]
    InconsistentOrientation(usize),
}

impl ValidityIssue {
    /// Whether the issue makes the profile impossible to sweep.
    #[must_use]
    pub fn is_fatal_for_profile(&self) -> bool {
        matches!(self, Self::SelfIntersectingLoop(_) | Self::CrossingLoops(..))
    }
}

/// An issue attributed to the extrude operation that introduced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityWarning {
    /// Extrude operation index, or `None` for whole-body issues.
    pub operation: Option<usize>,
    pub issue: ValidityIssue,
}

impl fmt::Display for ValidityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operation {
            Some(op) => write!(f, "operation {op}: {}", self.issue),
            None => write!(f, "{}", self.issue),
        }
    }
}

/// Result of checking a solid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidityReport {
    pub warnings: Vec<ValidityWarning>,
}

impl ValidityReport {
    /// Whether no issue was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// What the pipeline does with a failed check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidityPolicy {
    /// Log and surface warnings, then continue.
    #[default]
    Warn,
    /// Fail the request on the first warning.
    Reject,
}

impl ValidityPolicy {
    /// Applies the policy to a report, returning the warnings to surface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidityRejected`] under [`ValidityPolicy::Reject`]
    /// when the report is not clean.
    pub fn apply(self, report: ValidityReport) -> Result<Vec<ValidityWarning>> {
        if let (Self::Reject, Some(first)) = (self, report.warnings.first()) {
            return Err(Error::ValidityRejected(first.clone()));
        }
        for w in &report.warnings {
            warn!(warning = %w, "validity check failed");
        }
        Ok(report.warnings)
    }
}

/// Checks every feature of a solid and the combined mesh of the body. An
/// empty solid is valid.
///
/// # Errors
///
/// Returns [`Error::Topology`] if a feature references a missing entity.
pub fn check(solid: &Solid) -> Result<ValidityReport> {
    let Solid::Body(body) = solid else {
        return Ok(ValidityReport::default());
    };
    let mut warnings = Vec::new();
    for feature in body.features() {
        let issues = IsValid::new(feature.solid).execute(body.store())?;
        let issues = issues.into_iter().chain(check_profile(&feature.profile));
        warnings.extend(issues.map(|issue| ValidityWarning {
            operation: Some(feature.operation),
            issue,
        }));
    }
    if body.probe_volume() <= VOLUME_TOLERANCE {
        warnings.push(ValidityWarning {
            operation: None,
            issue: ValidityIssue::NonPositiveVolume(body.probe_volume()),
        });
    }
    warnings.extend(check_mesh(body.mesh()).into_iter().map(|issue| ValidityWarning {
        operation: None,
        issue,
    }));
    Ok(ValidityReport { warnings })
}

/// Checks that a mesh bounds a closed, consistently oriented volume.
///
/// Corners closer than [`POINT_TOLERANCE`] are merged first. Every edge must
/// then be used by exactly two triangles, once in each direction.
#[must_use]
pub fn check_mesh(mesh: &TriangleMesh) -> Vec<ValidityIssue> {
    let welded = TriangleMesh::from_triangles(mesh.triangles(), POINT_TOLERANCE);
    // (forward, backward) uses keyed by the ordered vertex pair.
    let mut uses: HashMap<(u32, u32), (usize, usize)> = HashMap::new();
    for tri in &welded.indices {
        for k in 0..3 {
            let (a, b) = (tri[k], tri[(k + 1) % 3]);
            let entry = uses.entry((a.min(b), a.max(b))).or_default();
            if a < b {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }
    }
    let (mut open, mut non_manifold, mut flipped) = (0, 0, 0);
    for &(forward, backward) in uses.values() {
        match (forward, backward) {
            (1, 1) => {}
            (f, b) if f + b == 1 => open += 1,
            (f, b) if f + b > 2 => non_manifold += 1,
            _ => flipped += 1,
        }
    }
    let mut issues = Vec::new();
    if open > 0 {
        issues.push(ValidityIssue::OpenMesh(open));
    }
    if non_manifold > 0 {
        issues.push(ValidityIssue::NonManifoldMesh(non_manifold));
    }
    if flipped > 0 {
        issues.push(ValidityIssue::InconsistentOrientation(flipped));
    }
    issues
}

/// Shorthand for [`check`] that treats lookup failures as invalid.
#[must_use]
pub fn is_valid(solid: &Solid) -> bool {
    check(solid).is_ok_and(|r| r.is_valid())
}

pub(crate) fn check_profile(profile: &Profile) -> Vec<ValidityIssue> {
    let polylines: Vec<_> = profile.loops.iter().map(|l| l.polyline()).collect();
    let mut issues = Vec::new();
    for (i, poly) in polylines.iter().enumerate() {
        if is_self_intersecting(poly) {
            issues.push(ValidityIssue::SelfIntersectingLoop(i));
        }
    }
    for i in 0..polylines.len() {
        for j in (i + 1)..polylines.len() {
            if polylines_cross(&polylines[i], &polylines[j]) {
                issues.push(ValidityIssue::CrossingLoops(i, j));
            }
        }
    }
    if let Some((outer, holes)) = polylines.split_first() {
        for (k, hole) in holes.iter().enumerate() {
            let inside = hole.iter().any(|p| point_in_polygon(p, outer));
            if !inside {
                issues.push(ValidityIssue::HoleOutsideOuter(k + 1));
            }
        }
    }
    issues
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Point2, Point3};
    use crate::reconstruct::{ProfileLoop, Reconstructor, Segment};
    use crate::tessellation::tessellate;
    use crate::sequence::{
        BooleanKind, CadSequence, Curve, ExtentType, Extrude, Loop, Operation, Sketch,
        SketchPlane,
    };

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn polygon(points: &[Point2]) -> ProfileLoop {
        let n = points.len();
        ProfileLoop {
            segments: (0..n)
                .map(|i| Segment::Line { start: points[i], end: points[(i + 1) % n] })
                .collect(),
        }
    }

    fn square_loop(x0: f64, y0: f64, s: f64) -> Loop {
        let pts = [p(x0, y0), p(x0 + s, y0), p(x0 + s, y0 + s), p(x0, y0 + s)];
        Loop {
            curves: (0..4)
                .map(|i| Curve::Line { start: pts[i], end: pts[(i + 1) % 4] })
                .collect(),
        }
    }

    fn solid(loops: Vec<Loop>) -> Solid {
        let seq = CadSequence::new(vec![
            Operation::Sketch(Sketch {
                plane: SketchPlane::default(),
                scale: 1.0,
                loops,
            }),
            Operation::Extrude(Extrude {
                sketch: 0,
                extent_one: 1.0,
                extent_two: 0.0,
                extent_type: ExtentType::OneSide,
                boolean: BooleanKind::NewBody,
            }),
        ])
        .unwrap();
        Reconstructor::default().reconstruct(&seq).unwrap()
    }

    fn tetra() -> TriangleMesh {
        TriangleMesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            indices: vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]],
        }
    }

    #[test]
    fn plate_with_hole_is_valid() {
        let s = solid(vec![square_loop(0.0, 0.0, 4.0), square_loop(1.0, 1.0, 1.0)]);
        let report = check(&s).unwrap();
        assert!(report.is_valid(), "{:?}", report.warnings);
        assert!(is_valid(&s));
    }

    #[test]
    fn empty_solid_is_valid() {
        assert!(is_valid(&Solid::Empty));
    }

    #[test]
    fn profile_defects_are_found() {
        let outer = polygon(&[p(0.0, 0.0), p(4.0, 0.0), p(4.0, 4.0), p(0.0, 4.0)]);
        let bow = polygon(&[p(0.0, 0.0), p(1.0, 1.0), p(1.0, 0.0), p(0.0, 1.0)]);
        let crossing = polygon(&[p(3.0, 3.0), p(3.0, 5.0), p(5.0, 5.0), p(5.0, 3.0)]);
        let far = polygon(&[p(9.0, 9.0), p(9.0, 10.0), p(10.0, 10.0), p(10.0, 9.0)]);
        let issues = check_profile(&Profile {
            loops: vec![outer, crossing, far],
        });
        assert!(issues.contains(&ValidityIssue::CrossingLoops(0, 1)));
        assert!(issues.contains(&ValidityIssue::HoleOutsideOuter(2)));
        let issues = check_profile(&Profile { loops: vec![bow] });
        assert_eq!(issues, vec![ValidityIssue::SelfIntersectingLoop(0)]);
    }

    // ── Mesh edge pairing ───────────────────────────────────────────

    #[test]
    fn closed_tetrahedron_passes() {
        assert!(tetra().signed_volume() > 0.0);
        assert!(check_mesh(&tetra()).is_empty());
        assert!(check_mesh(&TriangleMesh::default()).is_empty());
    }

    #[test]
    fn missing_face_is_open() {
        let mut mesh = tetra();
        mesh.indices.pop();
        assert_eq!(check_mesh(&mesh), vec![ValidityIssue::OpenMesh(3)]);
    }

    #[test]
    fn flipped_face_is_inconsistent() {
        let mut mesh = tetra();
        mesh.indices[0] = [0, 1, 2];
        assert_eq!(check_mesh(&mesh), vec![ValidityIssue::InconsistentOrientation(3)]);
    }

    #[test]
    fn unwelded_corners_are_merged() {
        let mesh = TriangleMesh {
            vertices: tetra().triangles().flatten().collect(),
            indices: (0..4u32).map(|t| [3 * t, 3 * t + 1, 3 * t + 2]).collect(),
        };
        assert!(check_mesh(&mesh).is_empty());
    }

    #[test]
    fn tetrahedra_sharing_an_edge_are_non_manifold() {
        let mut mesh = tetra();
        let mut mirrored = tetra();
        // Mirror image sharing only the edge from the origin to (0, 0, 1).
        for v in &mut mirrored.vertices {
            *v = Point3::new(-v.y, -v.x, v.z);
        }
        mesh.merge(&mirrored);
        assert_eq!(check_mesh(&mesh), vec![ValidityIssue::NonManifoldMesh(1)]);
    }

    #[test]
    fn boxes_touching_along_an_edge_are_flagged() {
        let seq = CadSequence::new(vec![
            Operation::Sketch(Sketch {
                plane: SketchPlane::default(),
                scale: 1.0,
                loops: vec![square_loop(0.0, 0.0, 1.0)],
            }),
            Operation::Extrude(Extrude {
                sketch: 0,
                extent_one: 1.0,
                extent_two: 0.0,
                extent_type: ExtentType::OneSide,
                boolean: BooleanKind::NewBody,
            }),
            Operation::Sketch(Sketch {
                plane: SketchPlane::default(),
                scale: 1.0,
                loops: vec![square_loop(1.0, 1.0, 1.0)],
            }),
            Operation::Extrude(Extrude {
                sketch: 2,
                extent_one: 1.0,
                extent_two: 0.0,
                extent_type: ExtentType::OneSide,
                boolean: BooleanKind::Join,
            }),
        ])
        .unwrap();
        let solid = Reconstructor::default().reconstruct(&seq).unwrap();
        let report = check(&solid).unwrap();
        assert!(!report.is_valid());
        assert!(report.warnings.iter().all(|w| w.operation.is_none()));
        assert!(report.warnings.iter().any(|w| matches!(
            w.issue,
            ValidityIssue::OpenMesh(_) | ValidityIssue::NonManifoldMesh(_)
        )));
        assert!(!check_mesh(&tessellate(&solid, 0.1).unwrap()).is_empty());
    }

    #[test]
    fn single_extrusion_mesh_is_closed() {
        let s = solid(vec![square_loop(0.0, 0.0, 4.0), square_loop(1.0, 1.0, 1.0)]);
        assert!(check_mesh(&tessellate(&s, 0.1).unwrap()).is_empty());
    }

    #[test]
    fn policies() {
        let report = ValidityReport {
            warnings: vec![ValidityWarning {
                operation: Some(1),
                issue: ValidityIssue::OpenWire,
            }],
        };
        let warned = ValidityPolicy::Warn.apply(report.clone()).unwrap();
        assert_eq!(warned.len(), 1);
        assert_eq!(warned[0].to_string(), "operation 1: wire is not a closed chain of edges");
        let err = ValidityPolicy::Reject.apply(report).unwrap_err();
        assert!(matches!(err, Error::ValidityRejected(_)));
        assert!(ValidityPolicy::Reject.apply(ValidityReport::default()).unwrap().is_empty());
    }
}
