//! Boolean combination of feature meshes.

mod bsp;

pub use bsp::{BspTree, Polygon};

use tracing::debug;

use crate::math::{POINT_TOLERANCE, TOLERANCE};
use crate::tessellation::TriangleMesh;

/// The type of boolean operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
}

/// Combines two closed, outward-oriented meshes.
///
/// Disjoint bounding boxes short-circuit: union concatenates, subtraction
/// keeps `a` and intersection is empty. Otherwise the meshes are clipped
/// against each other's BSP trees and the result is re-welded.
#[must_use]
pub fn mesh_boolean(a: &TriangleMesh, b: &TriangleMesh, op: BooleanOp) -> TriangleMesh {
    if !a.bounding_box().overlaps(&b.bounding_box(), TOLERANCE) {
        debug!(?op, "disjoint operands, skipping BSP");
        return match op {
            BooleanOp::Union => {
                let mut out = a.clone();
                out.merge(b);
                out
            }
            BooleanOp::Subtract => a.clone(),
            BooleanOp::Intersect => TriangleMesh::default(),
        };
    }

    let pa = to_polygons(a);
    let pb = to_polygons(b);
    let polygons = match op {
        BooleanOp::Union => bsp::union(pa, pb),
        BooleanOp::Subtract => bsp::subtract(pa, pb),
        BooleanOp::Intersect => bsp::intersect(pa, pb),
    };
    TriangleMesh::from_triangles(
        polygons.iter().flat_map(Polygon::triangles),
        POINT_TOLERANCE,
    )
}

fn to_polygons(mesh: &TriangleMesh) -> Vec<Polygon> {
    mesh.triangles().filter_map(Polygon::from_triangle).collect()
}
