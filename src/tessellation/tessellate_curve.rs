use std::collections::HashMap;

use crate::error::Result;
use crate::topology::{EdgeCurve, EdgeId, OrientedEdge, TopologyStore};

use super::{Polyline, TessellationParams};

/// Tessellates an edge into a polyline whose chord error stays below the
/// deflection.
///
/// The first and last points are exactly the edge's vertex positions, so
/// faces sharing the edge meet without gaps.
pub struct TessellateCurve {
    edge: EdgeId,
    params: TessellationParams,
}

impl TessellateCurve {
    /// Creates a new `TessellateCurve` operation.
    #[must_use]
    pub fn new(edge: EdgeId, params: TessellationParams) -> Self {
        Self { edge, params }
    }

    /// Executes the tessellation, returning a polyline.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge or its vertices are missing.
    #[allow(clippy::cast_precision_loss)]
    pub fn execute(&self, store: &TopologyStore) -> Result<Polyline> {
        let edge = store.edge(self.edge)?;
        let start = store.vertex(edge.start)?.point;
        let end = store.vertex(edge.end)?.point;
        let points = match &edge.curve {
            EdgeCurve::Line(_) => vec![start, end],
            EdgeCurve::Arc(arc) => {
                let domain = edge.curve.domain();
                let n = arc_segments(arc.radius(), arc.sweep().abs(), &self.params);
                let mut points = Vec::with_capacity(n + 1);
                points.push(start);
                for k in 1..n {
                    points.push(edge.curve.evaluate(domain.lerp(k as f64 / n as f64)));
                }
                points.push(end);
                points
            }
        };
        Ok(Polyline { points })
    }
}

/// Number of chords needed for an arc so the sagitta stays within the
/// deflection.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn arc_segments(radius: f64, sweep: f64, params: &TessellationParams) -> usize {
    if radius > params.deflection {
        let half_angle = (1.0 - params.deflection / radius).acos();
        let computed = (sweep / (2.0 * half_angle)).ceil() as usize;
        computed.clamp(params.min_segments, params.max_segments)
    } else {
        params.min_segments
    }
}

/// Caches edge polylines so every face bounded by an edge sees the same
/// points.
#[derive(Debug, Default)]
pub struct EdgeCache {
    params: TessellationParams,
    polylines: HashMap<EdgeId, Polyline>,
}

impl EdgeCache {
    /// Creates an empty cache for the given parameters.
    #[must_use]
    pub fn new(params: TessellationParams) -> Self {
        Self {
            params,
            polylines: HashMap::new(),
        }
    }

    /// Points of an oriented edge in traversal order.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge cannot be tessellated.
    pub fn oriented_points(
        &mut self,
        store: &TopologyStore,
        oe: OrientedEdge,
    ) -> Result<Vec<crate::math::Point3>> {
        if !self.polylines.contains_key(&oe.edge) {
            let polyline = TessellateCurve::new(oe.edge, self.params).execute(store)?;
            self.polylines.insert(oe.edge, polyline);
        }
        let mut points = self
            .polylines
            .get(&oe.edge)
            .map(|p| p.points.clone())
            .unwrap_or_default();
        if !oe.forward {
            points.reverse();
        }
        Ok(points)
    }
}
