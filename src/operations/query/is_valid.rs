use std::collections::HashMap;

use crate::error::TopologyError;
use crate::geometry::Surface;
use crate::math::POINT_TOLERANCE;
use crate::topology::{EdgeId, FaceSurface, SolidId, TopologyStore};
use crate::validity::ValidityIssue;

/// Validates the topological and geometric consistency of a solid.
pub struct IsValid {
    solid: SolidId,
}

impl IsValid {
    /// Creates a new `IsValid` query.
    #[must_use]
    pub fn new(solid: SolidId) -> Self {
        Self { solid }
    }

    /// Executes the validation, returning every issue found.
    ///
    /// Checks that wires are closed chains, that each shell uses every edge
    /// exactly once in each direction and that planar faces are flat.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EntityNotFound`] if the solid references a
    /// missing entity.
    pub fn execute(&self, store: &TopologyStore) -> Result<Vec<ValidityIssue>, TopologyError> {
        let mut issues = Vec::new();
        for shell_id in store.solid(self.solid)?.shells() {
            let shell = store.shell(shell_id)?;
            let mut uses: HashMap<EdgeId, (usize, usize)> = HashMap::new();
            for &face_id in &shell.faces {
                let face = store.face(face_id)?;
                for wire_id in face.wires() {
                    let wire = store.wire(wire_id)?;
                    let mut ends = Vec::with_capacity(wire.edges.len());
                    for &oe in &wire.edges {
                        ends.push(store.oriented_endpoints(oe)?);
                        let entry = uses.entry(oe.edge).or_default();
                        if oe.forward {
                            entry.0 += 1;
                        } else {
                            entry.1 += 1;
                        }
                    }
                    let n = ends.len();
                    let closed = n > 0 && (0..n).all(|i| ends[i].1 == ends[(i + 1) % n].0);
                    if !closed {
                        issues.push(ValidityIssue::OpenWire);
                    }
                    if let FaceSurface::Plane(plane) = &face.surface {
                        for (start, _) in &ends {
                            let d = plane.deviation(&store.vertex(*start)?.point);
                            if d > POINT_TOLERANCE {
                                issues.push(ValidityIssue::NonPlanarFace(d));
                                break;
                            }
                        }
                    }
                }
            }
            let mut unpaired: Vec<_> = uses
                .into_values()
                .filter(|&u| u != (1, 1))
                .collect();
            unpaired.sort_unstable();
            issues.extend(
                unpaired
                    .into_iter()
                    .map(|(forward, backward)| ValidityIssue::UnpairedEdge { forward, backward }),
            );
        }
        Ok(issues)
    }
}
