use tracing::debug;

use crate::error::{MeshingError, Result};
use crate::operations::boolean::mesh_boolean;
use crate::reconstruct::Solid;
use crate::topology::{SolidId, TopologyStore};

use super::{EdgeCache, TessellateFace, TessellationParams, TriangleMesh};

/// Tessellates all faces of a swept B-rep into one watertight mesh.
pub struct TessellateSolid {
    solid: SolidId,
    params: TessellationParams,
}

impl TessellateSolid {
    /// Creates a new `TessellateSolid` operation.
    #[must_use]
    pub fn new(solid: SolidId, params: TessellationParams) -> Self {
        Self { solid, params }
    }

    /// Executes the tessellation, returning a combined triangle mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if the solid or any of its faces cannot be tessellated.
    pub fn execute(&self, store: &TopologyStore) -> Result<TriangleMesh> {
        let mut cache = EdgeCache::new(self.params);
        let mut combined = TriangleMesh::default();
        for face_id in store.solid_faces(self.solid)? {
            let face_mesh = TessellateFace::new(face_id).execute(store, &mut cache)?;
            combined.merge(&face_mesh);
        }
        Ok(combined.welded())
    }
}

/// Tessellates a reconstructed solid at the given deflection.
///
/// Each feature is meshed from its exact B-rep and the meshes are combined
/// in sequence order with their boolean operations.
///
/// # Errors
///
/// Returns [`MeshingError::InvalidDeflection`] before any work if the
/// deflection is not positive and finite, and [`MeshingError::NoTriangles`]
/// if the solid is empty or the combination leaves nothing.
pub fn tessellate(solid: &Solid, deflection: f64) -> Result<TriangleMesh> {
    let params = TessellationParams::with_deflection(deflection)?;
    let Solid::Body(body) = solid else {
        return Err(MeshingError::NoTriangles.into());
    };

    let mut result: Option<TriangleMesh> = None;
    for feature in body.features() {
        let mesh = TessellateSolid::new(feature.solid, params).execute(body.store())?;
        result = Some(match result {
            None => mesh,
            Some(acc) => mesh_boolean(&acc, &mesh, feature.op),
        });
    }

    let mesh = result.unwrap_or_default();
    if mesh.is_empty() {
        return Err(MeshingError::NoTriangles.into());
    }
    debug!(deflection, triangles = mesh.triangle_count(), "tessellated solid");
    Ok(mesh)
}
