mod tessellate_curve;
mod tessellate_face;
mod tessellate_solid;

pub use tessellate_curve::{EdgeCache, TessellateCurve};
pub use tessellate_face::TessellateFace;
pub use tessellate_solid::{tessellate, TessellateSolid};

use std::collections::HashMap;

use crate::error::MeshingError;
use crate::math::{Aabb, Point3};

/// Parameters controlling tessellation quality.
#[derive(Debug, Clone, Copy)]
pub struct TessellationParams {
    /// Maximum chordal deviation from the true geometry.
    pub deflection: f64,
    /// Minimum number of segments for curved edges.
    pub min_segments: usize,
    /// Maximum number of segments for curved edges.
    pub max_segments: usize,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            deflection: 0.1,
            min_segments: 4,
            max_segments: 256,
        }
    }
}

impl TessellationParams {
    /// Default parameters with the given deflection.
    ///
    /// # Errors
    ///
    /// Returns [`MeshingError::InvalidDeflection`] unless `deflection` is
    /// positive and finite.
    pub fn with_deflection(deflection: f64) -> Result<Self, MeshingError> {
        if !(deflection.is_finite() && deflection > 0.0) {
            return Err(MeshingError::InvalidDeflection(deflection));
        }
        Ok(Self {
            deflection,
            ..Self::default()
        })
    }
}

/// A polyline approximation of a curve.
#[derive(Debug, Clone, Default)]
pub struct Polyline {
    /// The ordered vertices of the polyline.
    pub points: Vec<Point3>,
}

/// A triangle mesh over shared vertex positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangle indices (each triple defines a triangle).
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Whether the mesh has no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterates triangles as corner positions.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        self.indices.iter().map(|t| {
            [
                self.vertices[t[0] as usize],
                self.vertices[t[1] as usize],
                self.vertices[t[2] as usize],
            ]
        })
    }

    /// Bounding box of the referenced vertices.
    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for tri in self.triangles() {
            for p in &tri {
                aabb.include(p);
            }
        }
        aabb
    }

    /// Enclosed volume by the divergence theorem; positive for an outward
    /// oriented closed mesh.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        self.triangles()
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)))
            .sum::<f64>()
            / 6.0
    }

    /// Appends another mesh, re-indexing its triangles.
    #[allow(clippy::cast_possible_truncation)]
    pub fn merge(&mut self, other: &Self) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices
            .extend(other.indices.iter().map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]));
    }

    /// Builds a mesh from triangle corners, merging corners that fall into
    /// the same `tolerance` grid cell and dropping collapsed triangles.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_triangles(
        triangles: impl IntoIterator<Item = [Point3; 3]>,
        tolerance: f64,
    ) -> Self {
        let mut mesh = Self::default();
        let mut lookup: HashMap<[i64; 3], u32> = HashMap::new();
        for tri in triangles {
            let mut idx = [0u32; 3];
            for (slot, p) in idx.iter_mut().zip(&tri) {
                let key = grid_key(p, tolerance);
                *slot = *lookup.entry(key).or_insert_with(|| {
                    mesh.vertices.push(*p);
                    (mesh.vertices.len() - 1) as u32
                });
            }
            if idx[0] == idx[1] || idx[1] == idx[2] || idx[0] == idx[2] {
                continue;
            }
            let [a, b, c] = idx.map(|i| mesh.vertices[i as usize]);
            if (b - a).cross(&(c - a)).norm() <= tolerance * tolerance {
                continue;
            }
            mesh.indices.push(idx);
        }
        mesh
    }

    /// Merges vertices with bit-identical positions.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn welded(&self) -> Self {
        let mut out = Self::default();
        let mut lookup: HashMap<[u64; 3], u32> = HashMap::new();
        let remap: Vec<u32> = self
            .vertices
            .iter()
            .map(|p| {
                let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
                *lookup.entry(key).or_insert_with(|| {
                    out.vertices.push(*p);
                    (out.vertices.len() - 1) as u32
                })
            })
            .collect();
        out.indices = self
            .indices
            .iter()
            .map(|t| t.map(|i| remap[i as usize]))
            .filter(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2])
            .collect();
        out
    }
}

#[allow(clippy::cast_possible_truncation)]
fn grid_key(p: &Point3, tolerance: f64) -> [i64; 3] {
    [
        (p.x / tolerance).round() as i64,
        (p.y / tolerance).round() as i64,
        (p.z / tolerance).round() as i64,
    ]
}
