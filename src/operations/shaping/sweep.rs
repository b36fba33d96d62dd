use crate::error::TopologyError;
use crate::geometry::{Arc, Cylinder, Frame, Line, Plane};
use crate::math::{Point2, TOLERANCE};
use crate::reconstruct::profile::{Profile, ProfileLoop, Segment};
use crate::topology::{
    EdgeCurve, EdgeData, EdgeId, FaceData, FaceId, FaceSurface, OrientedEdge, ShellData,
    SolidData, SolidId, TopologyStore, VertexData, VertexId, WireData,
};

/// Sweeps a planar profile along its frame normal into a closed solid.
///
/// The profile is placed in `frame` and swept between the offsets `low`
/// and `high` along the frame normal. Lines become planar side faces and
/// arcs become cylindrical ones.
pub struct SweepProfile<'a> {
    profile: &'a Profile,
    frame: &'a Frame,
    low: f64,
    high: f64,
}

/// Edges created for one profile loop.
struct LoopEdges {
    bottom: Vec<EdgeId>,
    top: Vec<EdgeId>,
}

impl<'a> SweepProfile<'a> {
    /// Creates a new `SweepProfile` operation.
    #[must_use]
    pub fn new(profile: &'a Profile, frame: &'a Frame, low: f64, high: f64) -> Self {
        Self {
            profile,
            frame,
            low,
            high,
        }
    }

    /// Executes the sweep, creating the solid in the topology store.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidTopology`] if the span is empty.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId, TopologyError> {
        if self.high - self.low <= TOLERANCE {
            return Err(TopologyError::InvalidTopology(format!(
                "sweep span [{}, {}] is empty",
                self.low, self.high
            )));
        }

        let mut faces = Vec::new();
        let mut loops = Vec::with_capacity(self.profile.loops.len());
        for lp in &self.profile.loops {
            loops.push(self.sweep_loop(store, lp, &mut faces));
        }

        // Bottom cap faces -N: its wires are the bottom edges reversed.
        let bottom_wires: Vec<_> = loops
            .iter()
            .map(|l| {
                store.add_wire(WireData {
                    edges: l
                        .bottom
                        .iter()
                        .rev()
                        .map(|&e| OrientedEdge::new(e, false))
                        .collect(),
                })
            })
            .collect();
        let top_wires: Vec<_> = loops
            .iter()
            .map(|l| {
                store.add_wire(WireData {
                    edges: l.top.iter().map(|&e| OrientedEdge::new(e, true)).collect(),
                })
            })
            .collect();

        let f = self.frame;
        let bottom = Plane::new(f.to_world(&Point2::origin(), self.low), f.y_axis, f.x_axis);
        let top = Plane::new(f.to_world(&Point2::origin(), self.high), f.x_axis, f.y_axis);
        faces.insert(0, add_cap(store, bottom, &bottom_wires));
        faces.insert(1, add_cap(store, top, &top_wires));

        let shell = store.add_shell(ShellData {
            faces,
            is_closed: true,
        });
        Ok(store.add_solid(SolidData {
            outer_shell: shell,
            inner_shells: Vec::new(),
        }))
    }

    /// Creates the vertices, edges and side faces of one loop.
    fn sweep_loop(
        &self,
        store: &mut TopologyStore,
        lp: &ProfileLoop,
        faces: &mut Vec<FaceId>,
    ) -> LoopEdges {
        let f = self.frame;
        let n = lp.segments.len();
        let lift = |store: &mut TopologyStore, p: &Point2, z: f64| -> VertexId {
            store.add_vertex(VertexData::new(f.to_world(p, z)))
        };

        let bottom_v: Vec<VertexId> = lp
            .segments
            .iter()
            .map(|s| lift(store, &s.start(), self.low))
            .collect();
        let top_v: Vec<VertexId> = lp
            .segments
            .iter()
            .map(|s| lift(store, &s.start(), self.high))
            .collect();

        let mut vertical = Vec::with_capacity(n);
        for i in 0..n {
            let p = lp.segments[i].start();
            vertical.push(store.add_edge(EdgeData {
                start: bottom_v[i],
                end: top_v[i],
                curve: EdgeCurve::Line(Line::new(
                    f.to_world(&p, self.low),
                    f.to_world(&p, self.high),
                )),
            }));
        }

        let mut edges = LoopEdges {
            bottom: Vec::with_capacity(n),
            top: Vec::with_capacity(n),
        };
        for (i, seg) in lp.segments.iter().enumerate() {
            let j = (i + 1) % n;
            let bottom = store.add_edge(EdgeData {
                start: bottom_v[i],
                end: bottom_v[j],
                curve: self.edge_curve(seg, self.low),
            });
            let top = store.add_edge(EdgeData {
                start: top_v[i],
                end: top_v[j],
                curve: self.edge_curve(seg, self.high),
            });
            let wire = store.add_wire(WireData {
                edges: vec![
                    OrientedEdge::new(bottom, true),
                    OrientedEdge::new(vertical[j], true),
                    OrientedEdge::new(top, false),
                    OrientedEdge::new(vertical[i], false),
                ],
            });
            let (surface, same_sense) = self.side_surface(seg);
            faces.push(store.add_face(FaceData {
                surface,
                outer_wire: wire,
                inner_wires: Vec::new(),
                same_sense,
            }));
            edges.bottom.push(bottom);
            edges.top.push(top);
        }
        edges
    }

    fn edge_curve(&self, seg: &Segment, z: f64) -> EdgeCurve {
        let f = self.frame;
        match seg {
            Segment::Line { start, end } => {
                EdgeCurve::Line(Line::new(f.to_world(start, z), f.to_world(end, z)))
            }
            Segment::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => EdgeCurve::Arc(Arc::new(
                f.to_world(center, z),
                *radius,
                f.normal,
                f.x_axis,
                *start_angle,
                *sweep,
            )),
        }
    }

    /// Side surface of a segment; the face runs along the segment and up the
    /// normal, so its outward side is `direction × normal`.
    fn side_surface(&self, seg: &Segment) -> (FaceSurface, bool) {
        let f = self.frame;
        match seg {
            Segment::Line { start, end } => {
                let origin = f.to_world(start, self.low);
                let dir = f.to_world(end, self.low) - origin;
                (FaceSurface::Plane(Plane::new(origin, dir, f.normal)), true)
            }
            Segment::Arc {
                center,
                radius,
                sweep,
                ..
            } => (
                FaceSurface::Cylinder(Cylinder::new(
                    f.to_world(center, self.low),
                    *radius,
                    f.normal,
                )),
                *sweep > 0.0,
            ),
        }
    }
}

fn add_cap(store: &mut TopologyStore, plane: Plane, wires: &[crate::topology::WireId]) -> FaceId {
    store.add_face(FaceData {
        surface: FaceSurface::Plane(plane),
        outer_wire: wires[0],
        inner_wires: wires[1..].to_vec(),
        same_sense: true,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::Surface;
    use crate::math::{Point3, Vector3};
    use std::collections::HashMap;
    use std::f64::consts::TAU;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn polygon(points: &[Point2]) -> ProfileLoop {
        let n = points.len();
        ProfileLoop {
            segments: (0..n)
                .map(|i| Segment::Line {
                    start: points[i],
                    end: points[(i + 1) % n],
                })
                .collect(),
        }
    }

    fn rectangle() -> Profile {
        Profile {
            loops: vec![polygon(&[p(0.0, 0.0), p(4.0, 0.0), p(4.0, 3.0), p(0.0, 3.0)])],
        }
    }

    fn disc(radius: f64) -> Profile {
        Profile {
            loops: vec![ProfileLoop {
                segments: vec![Segment::Arc {
                    center: p(0.0, 0.0),
                    radius,
                    start_angle: 0.0,
                    sweep: TAU,
                }],
            }],
        }
    }

    fn edge_uses(store: &TopologyStore, solid: SolidId) -> HashMap<EdgeId, (usize, usize)> {
        let mut uses: HashMap<EdgeId, (usize, usize)> = HashMap::new();
        for face in store.solid_faces(solid).unwrap() {
            for wire in store.face(face).unwrap().wires() {
                for oe in &store.wire(wire).unwrap().edges {
                    let entry = uses.entry(oe.edge).or_default();
                    if oe.forward {
                        entry.0 += 1;
                    } else {
                        entry.1 += 1;
                    }
                }
            }
        }
        uses
    }

    // ── Box ────────────────────────────────────────────────────

    #[test]
    fn rectangle_sweep_has_6_faces() {
        let mut store = TopologyStore::new();
        let profile = rectangle();
        let frame = Frame::world();
        let solid = SweepProfile::new(&profile, &frame, 0.0, 10.0)
            .execute(&mut store)
            .unwrap();
        assert_eq!(store.solid_faces(solid).unwrap().len(), 6);
    }

    #[test]
    fn every_edge_used_once_each_way() {
        let mut store = TopologyStore::new();
        let mut profile = rectangle();
        let hole = polygon(&[p(1.0, 1.0), p(1.0, 2.0), p(2.0, 2.0), p(2.0, 1.0)]);
        profile.loops.push(hole);
        let frame = Frame::world();
        let solid = SweepProfile::new(&profile, &frame, -1.0, 1.0)
            .execute(&mut store)
            .unwrap();
        let uses = edge_uses(&store, solid);
        assert_eq!(uses.len(), 24);
        assert!(uses.values().all(|&u| u == (1, 1)));
    }

    #[test]
    fn side_normals_point_outward() {
        let mut store = TopologyStore::new();
        let profile = rectangle();
        let frame = Frame::world();
        let solid = SweepProfile::new(&profile, &frame, 0.0, 2.0)
            .execute(&mut store)
            .unwrap();
        let centroid = Point3::new(2.0, 1.5, 1.0);
        for face_id in store.solid_faces(solid).unwrap() {
            let face = store.face(face_id).unwrap();
            let FaceSurface::Plane(plane) = &face.surface else {
                panic!("rectangle sweep has only planar faces");
            };
            let on_face = plane.origin();
            let n = face.outward_normal(on_face);
            let to_face = on_face - centroid;
            let along = n.dot(&to_face);
            assert!(along > 0.0, "face normal {n:?} points inward");
        }
    }

    // ── Cylinder ───────────────────────────────────────────────

    #[test]
    fn circle_sweep_is_a_cylinder() {
        let mut store = TopologyStore::new();
        let profile = disc(1.5);
        let frame = Frame::world();
        let solid = SweepProfile::new(&profile, &frame, 0.0, 1.0)
            .execute(&mut store)
            .unwrap();
        let faces = store.solid_faces(solid).unwrap();
        assert_eq!(faces.len(), 3);
        let side = store.face(faces[2]).unwrap();
        let FaceSurface::Cylinder(cyl) = &side.surface else {
            panic!("expected a cylindrical side");
        };
        assert!((cyl.radius() - 1.5).abs() < TOLERANCE);
        let n = side.outward_normal(&Point3::new(1.5, 0.0, 0.5));
        assert!((n - Vector3::x()).norm() < 1e-12);
        assert!(cyl.deviation(&Point3::new(0.0, 1.5, 0.3)) < 1e-12);
        assert!(edge_uses(&store, solid).values().all(|&u| u == (1, 1)));
    }

    #[test]
    fn empty_span_is_rejected() {
        let mut store = TopologyStore::new();
        let profile = rectangle();
        let frame = Frame::world();
        assert!(SweepProfile::new(&profile, &frame, 1.0, 1.0)
            .execute(&mut store)
            .is_err());
    }
}
