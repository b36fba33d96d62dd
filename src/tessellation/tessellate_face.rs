use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{
    ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation,
};

use crate::error::{MeshingError, Result};
use crate::geometry::Plane;
use crate::math::Point3;
use crate::topology::{FaceData, FaceId, FaceSurface, TopologyStore, WireId};

use super::{EdgeCache, TriangleMesh};

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Tessellates a face into a triangle mesh wound counter-clockwise about
/// the face's outward normal.
pub struct TessellateFace {
    face: FaceId,
}

impl TessellateFace {
    /// Creates a new `TessellateFace` operation.
    #[must_use]
    pub fn new(face: FaceId) -> Self {
        Self { face }
    }

    /// Executes the tessellation, sampling edges through `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`MeshingError::Failed`] if a boundary crosses itself or a
    /// side face does not have the swept four-edge shape.
    pub fn execute(&self, store: &TopologyStore, cache: &mut EdgeCache) -> Result<TriangleMesh> {
        let face = store.face(self.face)?;
        match &face.surface {
            FaceSurface::Plane(plane) => tessellate_plane(store, cache, face, plane),
            FaceSurface::Cylinder(_) => tessellate_ruled(store, cache, face.outer_wire),
        }
    }
}

/// Closed loop of points around a wire; each edge contributes all but its
/// last point.
fn wire_points(store: &TopologyStore, cache: &mut EdgeCache, wire: WireId) -> Result<Vec<Point3>> {
    let mut points = Vec::new();
    for &oe in &store.wire(wire)?.edges {
        let pts = cache.oriented_points(store, oe)?;
        points.extend_from_slice(&pts[..pts.len().saturating_sub(1)]);
    }
    Ok(points)
}

/// Tessellates a planar face using CDT.
#[allow(clippy::cast_possible_truncation)]
fn tessellate_plane(
    store: &TopologyStore,
    cache: &mut EdgeCache,
    face: &FaceData,
    plane: &Plane,
) -> Result<TriangleMesh> {
    let mut cdt = Cdt::new();
    let mut positions: HashMap<usize, Point3> = HashMap::new();
    for wire in face.wires() {
        let points = wire_points(store, cache, wire)?;
        insert_constraint_loop(&mut cdt, plane, &points, &mut positions)?;
    }

    let interior = classify_interior_faces(&cdt);
    let normal = face.outward_normal(plane.origin());

    let mut mesh = TriangleMesh::default();
    let mut vertex_map: HashMap<usize, u32> = HashMap::new();
    for face_handle in cdt.inner_faces() {
        if !interior.contains(&face_handle.fix().index()) {
            continue;
        }
        let mut tri = [0u32; 3];
        let mut corners = [Point3::origin(); 3];
        for (i, vh) in face_handle.vertices().iter().enumerate() {
            let idx = vh.fix().index();
            let p = positions.get(&idx).copied().ok_or_else(|| {
                MeshingError::Failed("triangulation introduced an unknown vertex".into())
            })?;
            corners[i] = p;
            tri[i] = *vertex_map.entry(idx).or_insert_with(|| {
                mesh.vertices.push(p);
                (mesh.vertices.len() - 1) as u32
            });
        }
        let n = (corners[1] - corners[0]).cross(&(corners[2] - corners[0]));
        if n.dot(&normal) < 0.0 {
            tri.swap(1, 2);
        }
        mesh.indices.push(tri);
    }
    Ok(mesh)
}

/// Inserts a closed loop into the CDT as constraint edges.
fn insert_constraint_loop(
    cdt: &mut Cdt,
    plane: &Plane,
    points: &[Point3],
    positions: &mut HashMap<usize, Point3>,
) -> Result<()> {
    if points.len() < 3 {
        return Err(MeshingError::Failed("constraint loop needs at least 3 points".into()).into());
    }

    let mut handles = Vec::with_capacity(points.len());
    for p in points {
        let uv = plane.project(p);
        let h = cdt
            .insert(SpadePoint2::new(uv.x, uv.y))
            .map_err(|e: InsertionError| MeshingError::Failed(format!("CDT insert: {e}")))?;
        positions.entry(h.index()).or_insert(*p);
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        if !cdt.can_add_constraint(from, to) {
            return Err(MeshingError::Failed("face boundary crosses itself".into()).into());
        }
        cdt.add_constraint(from, to);
    }

    Ok(())
}

/// Classifies which inner faces of the CDT are inside the polygon using flood-fill.
///
/// Starts from faces adjacent to the outer (infinite) face at depth 0. Each time
/// a constraint edge is crossed, depth increments. Odd depth = interior.
fn classify_interior_faces(cdt: &Cdt) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() == outer_fix {
            if let Some(inner) = edge.rev().face().as_inner() {
                let idx = inner.fix().index();
                if depth_map.contains_key(&idx) {
                    continue;
                }
                let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth_map.insert(idx, depth);
                if depth % 2 == 1 {
                    interior.insert(idx);
                }
                queue.push_back((inner.fix(), depth));
            }
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        for edge in cdt.face(face_fix).adjacent_edges() {
            if let Some(neighbor) = edge.rev().face().as_inner() {
                let n_idx = neighbor.fix().index();
                if depth_map.contains_key(&n_idx) {
                    continue;
                }
                let crossing = cdt.is_constraint_edge(edge.as_undirected().fix());
                let new_depth = depth + u32::from(crossing);
                depth_map.insert(n_idx, new_depth);
                if new_depth % 2 == 1 {
                    interior.insert(n_idx);
                }
                queue.push_back((neighbor.fix(), new_depth));
            }
        }
    }

    interior
}

/// Tessellates a swept side face as a strip between its first and third
/// edges. The wire runs bottom, up, top (reversed), down.
#[allow(clippy::cast_possible_truncation)]
fn tessellate_ruled(
    store: &TopologyStore,
    cache: &mut EdgeCache,
    wire: WireId,
) -> Result<TriangleMesh> {
    let edges = &store.wire(wire)?.edges;
    if edges.len() != 4 {
        return Err(MeshingError::Failed(format!(
            "ruled face expects 4 boundary edges, found {}",
            edges.len()
        ))
        .into());
    }
    let lower = cache.oriented_points(store, edges[0])?;
    let mut upper = cache.oriented_points(store, edges[2])?;
    upper.reverse();
    if lower.len() != upper.len() || lower.len() < 2 {
        return Err(MeshingError::Failed("ruled face rails differ in length".into()).into());
    }

    let n = lower.len() as u32;
    let mut mesh = TriangleMesh::default();
    mesh.vertices.extend_from_slice(&lower);
    mesh.vertices.extend_from_slice(&upper);
    for k in 0..n - 1 {
        mesh.indices.push([k, k + 1, n + k + 1]);
        mesh.indices.push([k, n + k + 1, n + k]);
    }
    Ok(mesh)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::Frame;
    use crate::math::{Point2, Vector3};
    use crate::operations::shaping::SweepProfile;
    use crate::reconstruct::profile::{Profile, ProfileLoop, Segment};
    use crate::tessellation::TessellationParams;
    use approx::assert_relative_eq;

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

    fn mesh_area(mesh: &TriangleMesh, normal: &Vector3) -> f64 {
        mesh.triangles()
            .map(|[a, b, c]| (b - a).cross(&(c - a)).dot(normal) / 2.0)
            .sum()
    }

    #[test]
    fn cap_with_hole_has_correct_area_and_winding() {
        let profile = Profile {
            loops: vec![
                polygon(&[p(0.0, 0.0), p(4.0, 0.0), p(4.0, 4.0), p(0.0, 4.0)]),
                polygon(&[p(1.0, 1.0), p(1.0, 3.0), p(3.0, 3.0), p(3.0, 1.0)]),
            ],
        };
        let frame = Frame::world();
        let mut store = TopologyStore::new();
        let solid = SweepProfile::new(&profile, &frame, 0.0, 1.0).execute(&mut store).unwrap();
        let faces = store.solid_faces(solid).unwrap();
        let mut cache = EdgeCache::new(TessellationParams::default());
        let top = TessellateFace::new(faces[1]).execute(&store, &mut cache).unwrap();
        assert_relative_eq!(mesh_area(&top, &Vector3::z()), 12.0, epsilon = 1e-9);
        let bottom = TessellateFace::new(faces[0]).execute(&store, &mut cache).unwrap();
        assert_relative_eq!(mesh_area(&bottom, &-Vector3::z()), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn cylinder_side_is_a_strip() {
        let profile = Profile {
            loops: vec![ProfileLoop {
                segments: vec![Segment::Arc {
                    center: p(0.0, 0.0),
                    radius: 1.0,
                    start_angle: 0.0,
                    sweep: std::f64::consts::TAU,
                }],
            }],
        };
        let frame = Frame::world();
        let mut store = TopologyStore::new();
        let solid = SweepProfile::new(&profile, &frame, 0.0, 2.0).execute(&mut store).unwrap();
        let faces = store.solid_faces(solid).unwrap();
        let params = TessellationParams::with_deflection(0.05).unwrap();
        let mut cache = EdgeCache::new(params);
        let side = TessellateFace::new(faces[2]).execute(&store, &mut cache).unwrap();
        let cap = TessellateFace::new(faces[1]).execute(&store, &mut cache).unwrap();
        // n segments give 2n side triangles and n - 2 cap triangles.
        assert_eq!(side.triangle_count(), 2 * (cap.triangle_count() + 2));
        for [a, b, c] in side.triangles() {
            let n = (b - a).cross(&(c - a));
            let centroid = (a.coords + b.coords + c.coords) / 3.0;
            assert!(n.dot(&Vector3::new(centroid.x, centroid.y, 0.0)) > 0.0);
        }
    }

    #[test]
    fn crossing_boundary_is_reported() {
        let profile = Profile {
            loops: vec![polygon(&[p(0.0, 0.0), p(2.0, 2.0), p(2.0, 0.0), p(0.0, 2.0)])],
        };
        let frame = Frame::world();
        let mut store = TopologyStore::new();
        let solid = SweepProfile::new(&profile, &frame, 0.0, 1.0).execute(&mut store).unwrap();
        let faces = store.solid_faces(solid).unwrap();
        let mut cache = EdgeCache::new(TessellationParams::default());
        assert!(TessellateFace::new(faces[1]).execute(&store, &mut cache).is_err());
    }
}
