use crate::geometry::{Arc, Curve, CurveDomain, Line};
use crate::math::Point3;

use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for an edge in the topology store.
    pub struct EdgeId;
}

/// The geometric curve associated with an edge.
#[derive(Debug, Clone)]
pub enum EdgeCurve {
    /// A line segment.
    Line(Line),
    /// A circular arc; a full circle when its sweep is 2π.
    Arc(Arc),
}

impl EdgeCurve {
    /// Evaluates the underlying curve at parameter `t`.
    #[must_use]
    pub fn evaluate(&self, t: f64) -> Point3 {
        match self {
            Self::Line(line) => line.evaluate(t),
            Self::Arc(arc) => arc.evaluate(t),
        }
    }

    /// Returns the parameter domain of the underlying curve.
    #[must_use]
    pub fn domain(&self) -> CurveDomain {
        match self {
            Self::Line(line) => line.domain(),
            Self::Arc(arc) => arc.domain(),
        }
    }
}

/// Data associated with a topological edge.
///
/// An edge connects two vertices (the same vertex twice for a closed
/// curve) and carries the curve running between them over its domain.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Start vertex of the edge.
    pub start: VertexId,
    /// End vertex of the edge.
    pub end: VertexId,
    /// The geometric curve defining this edge's shape.
    pub curve: EdgeCurve,
}
