use crate::geometry::surface::{Cylinder, Plane, Surface};
use crate::math::{Point3, Vector3};

use super::wire::WireId;

slotmap::new_key_type! {
    /// Unique identifier for a face in the topology store.
    pub struct FaceId;
}

/// The geometric surface associated with a face.
#[derive(Debug, Clone)]
pub enum FaceSurface {
    /// A planar surface (caps and straight side walls).
    Plane(Plane),
    /// A cylindrical surface (side walls swept from arcs and circles).
    Cylinder(Cylinder),
}

impl FaceSurface {
    /// Returns the surface as a trait object.
    #[must_use]
    pub fn as_surface(&self) -> &dyn Surface {
        match self {
            Self::Plane(plane) => plane,
            Self::Cylinder(cyl) => cyl,
        }
    }
}

/// Data associated with a topological face.
///
/// A face is a bounded region on a surface, defined by an outer wire and
/// optionally inner wires (holes). Wires run counter-clockwise about the
/// outward normal.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// The geometric surface on which this face lies.
    pub surface: FaceSurface,
    /// The outer boundary wire.
    pub outer_wire: WireId,
    /// Inner boundary wires (holes).
    pub inner_wires: Vec<WireId>,
    /// If `true`, the face normal agrees with the surface normal.
    pub same_sense: bool,
}

impl FaceData {
    /// Outward normal of the face at (or nearest to) `p`.
    #[must_use]
    pub fn outward_normal(&self, p: &Point3) -> Vector3 {
        let n = self.surface.as_surface().normal_at(p);
        if self.same_sense {
            n
        } else {
            -n
        }
    }

    /// All wires of the face, outer first.
    pub fn wires(&self) -> impl Iterator<Item = WireId> + '_ {
        std::iter::once(self.outer_wire).chain(self.inner_wires.iter().copied())
    }
}
