pub mod edge;
pub mod face;
pub mod shell;
pub mod solid;
pub mod vertex;
pub mod wire;

pub use edge::{EdgeCurve, EdgeData, EdgeId};
pub use face::{FaceData, FaceId, FaceSurface};
pub use shell::{ShellData, ShellId};
pub use solid::{SolidData, SolidId};
pub use vertex::{VertexData, VertexId};
pub use wire::{OrientedEdge, WireData, WireId};

use crate::error::TopologyError;
use slotmap::{Key, SlotMap};

/// Central arena that owns all topological entities.
///
/// Entities reference each other via typed IDs (generational indices).
/// A store is append-only: swept features are built once and never edited.
#[derive(Debug, Default, Clone)]
pub struct TopologyStore {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    wires: SlotMap<WireId, WireData>,
    faces: SlotMap<FaceId, FaceData>,
    shells: SlotMap<ShellId, ShellData>,
    solids: SlotMap<SolidId, SolidData>,
}

fn lookup<'a, K: Key, V>(
    map: &'a SlotMap<K, V>,
    id: K,
    kind: &'static str,
) -> Result<&'a V, TopologyError> {
    map.get(id).ok_or(TopologyError::EntityNotFound(kind))
}

impl TopologyStore {
    /// Creates a new, empty topology store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Insertion ---

    /// Inserts a vertex and returns its ID.
    pub fn add_vertex(&mut self, data: VertexData) -> VertexId {
        self.vertices.insert(data)
    }

    /// Inserts an edge and returns its ID.
    pub fn add_edge(&mut self, data: EdgeData) -> EdgeId {
        self.edges.insert(data)
    }

    /// Inserts a wire and returns its ID.
    pub fn add_wire(&mut self, data: WireData) -> WireId {
        self.wires.insert(data)
    }

    /// Inserts a face and returns its ID.
    pub fn add_face(&mut self, data: FaceData) -> FaceId {
        self.faces.insert(data)
    }

    /// Inserts a shell and returns its ID.
    pub fn add_shell(&mut self, data: ShellData) -> ShellId {
        self.shells.insert(data)
    }

    /// Inserts a solid and returns its ID.
    pub fn add_solid(&mut self, data: SolidData) -> SolidId {
        self.solids.insert(data)
    }

    // --- Lookup ---

    /// Returns the vertex data.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EntityNotFound`] if the ID is stale.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData, TopologyError> {
        lookup(&self.vertices, id, "vertex")
    }

    /// Returns the edge data.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EntityNotFound`] if the ID is stale.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData, TopologyError> {
        lookup(&self.edges, id, "edge")
    }

    /// Returns the wire data.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EntityNotFound`] if the ID is stale.
    pub fn wire(&self, id: WireId) -> Result<&WireData, TopologyError> {
        lookup(&self.wires, id, "wire")
    }

    /// Returns the face data.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EntityNotFound`] if the ID is stale.
    pub fn face(&self, id: FaceId) -> Result<&FaceData, TopologyError> {
        lookup(&self.faces, id, "face")
    }

    /// Returns the shell data.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EntityNotFound`] if the ID is stale.
    pub fn shell(&self, id: ShellId) -> Result<&ShellData, TopologyError> {
        lookup(&self.shells, id, "shell")
    }

    /// Returns the solid data.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EntityNotFound`] if the ID is stale.
    pub fn solid(&self, id: SolidId) -> Result<&SolidData, TopologyError> {
        lookup(&self.solids, id, "solid")
    }

    // --- Traversal ---

    /// Collects every face of a solid, across all of its shells.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EntityNotFound`] if any referenced entity is missing.
    pub fn solid_faces(&self, id: SolidId) -> Result<Vec<FaceId>, TopologyError> {
        let solid = self.solid(id)?;
        let mut faces = Vec::new();
        for shell_id in solid.shells() {
            faces.extend_from_slice(&self.shell(shell_id)?.faces);
        }
        Ok(faces)
    }

    /// Start and end vertices of an oriented edge, in traversal order.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EntityNotFound`] if the edge is missing.
    pub fn oriented_endpoints(
        &self,
        oe: OrientedEdge,
    ) -> Result<(VertexId, VertexId), TopologyError> {
        let edge = self.edge(oe.edge)?;
        Ok(if oe.forward {
            (edge.start, edge.end)
        } else {
            (edge.end, edge.start)
        })
    }
}
