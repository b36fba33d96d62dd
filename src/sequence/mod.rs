//! Structured CAD sequences and their fixed-width vector encoding.

mod codec;
mod quantize;
mod vector;

pub use codec::SequenceCodec;
pub use quantize::{ArgKind, Quantization};
pub use vector::{
    command_record, discrete, is_padding, pad_record, CadSequenceVector, Command, Record,
    COLUMN_NAMES, COL_BOOLEAN, COL_CMD, COL_EXTENT_TYPE, COL_FLAG, COL_X, COL_Y, PAD_VALUE,
    RECORD_WIDTH,
};

use crate::error::SequenceError;
use crate::geometry::Frame;
use crate::math::{Point2, Point3};

/// A 2D profile curve in sketch-local, unscaled coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    /// Straight segment.
    Line { start: Point2, end: Point2 },
    /// Circular arc from `start` to `end` sweeping `sweep` radians
    /// (non-negative) in the direction given by `counter_clockwise`.
    Arc {
        start: Point2,
        end: Point2,
        sweep: f64,
        counter_clockwise: bool,
    },
    /// Full circle; forms a loop on its own.
    Circle { center: Point2, radius: f64 },
}

impl Curve {
    /// Point the vector record stores for this curve: the end point, or the
    /// center of a circle.
    #[must_use]
    pub fn anchor(&self) -> Point2 {
        match self {
            Self::Line { end, .. } | Self::Arc { end, .. } => *end,
            Self::Circle { center, .. } => *center,
        }
    }
}

/// A closed loop of curves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Loop {
    pub curves: Vec<Curve>,
}

/// Placement of a sketch: origin plus orientation angles.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchPlane {
    pub origin: Point3,
    pub theta: f64,
    pub phi: f64,
    pub gamma: f64,
}

impl SketchPlane {
    /// Coordinate frame the sketch lives in.
    #[must_use]
    pub fn frame(&self) -> Frame {
        Frame::from_angles(self.origin, self.theta, self.phi, self.gamma)
    }
}

impl Default for SketchPlane {
    fn default() -> Self {
        Self {
            origin: Point3::origin(),
            theta: 0.0,
            phi: 0.0,
            gamma: 0.0,
        }
    }
}

/// A planar sketch: loops placed on a plane and scaled uniformly.
///
/// The first loop is the outer boundary; further loops are holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Sketch {
    pub plane: SketchPlane,
    pub scale: f64,
    pub loops: Vec<Loop>,
}

impl Sketch {
    /// Whether no loop contains a curve.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loops.iter().all(|l| l.curves.is_empty())
    }
}

/// How an extrusion combines with the body built so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanKind {
    NewBody,
    Join,
    Cut,
    Intersect,
}

impl BooleanKind {
    /// Parses a discriminant.
    #[must_use]
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::NewBody),
            1 => Some(Self::Join),
            2 => Some(Self::Cut),
            3 => Some(Self::Intersect),
            _ => None,
        }
    }

    /// Discriminant as stored in the vector.
    #[must_use]
    pub fn index(self) -> f64 {
        match self {
            Self::NewBody => 0.0,
            Self::Join => 1.0,
            Self::Cut => 2.0,
            Self::Intersect => 3.0,
        }
    }
}

/// Extent interpretation of an extrusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentType {
    OneSide,
    Symmetric,
    TwoSides,
}

impl ExtentType {
    /// Parses a discriminant.
    #[must_use]
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::OneSide),
            1 => Some(Self::Symmetric),
            2 => Some(Self::TwoSides),
            _ => None,
        }
    }

    /// Discriminant as stored in the vector.
    #[must_use]
    pub fn index(self) -> f64 {
        match self {
            Self::OneSide => 0.0,
            Self::Symmetric => 1.0,
            Self::TwoSides => 2.0,
        }
    }
}

/// Extrusion of a preceding sketch.
#[derive(Debug, Clone, PartialEq)]
pub struct Extrude {
    /// Index of the sketch operation in the owning sequence.
    pub sketch: usize,
    pub extent_one: f64,
    pub extent_two: f64,
    pub extent_type: ExtentType,
    pub boolean: BooleanKind,
}

impl Extrude {
    /// Offsets along the sketch normal bounding the swept volume, ordered
    /// `(low, high)`.
    #[must_use]
    pub fn span(&self) -> (f64, f64) {
        match self.extent_type {
            ExtentType::OneSide => {
                let e = self.extent_one;
                (e.min(0.0), e.max(0.0))
            }
            ExtentType::Symmetric => {
                let e = self.extent_one.abs();
                (-e, e)
            }
            ExtentType::TwoSides => {
                let (a, b) = (-self.extent_two, self.extent_one);
                (a.min(b), a.max(b))
            }
        }
    }
}

/// One step of a CAD sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Sketch(Sketch),
    Extrude(Extrude),
}

/// An ordered list of sketch and extrude operations.
///
/// Every extrude references a sketch earlier in the same list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CadSequence {
    operations: Vec<Operation>,
}

impl CadSequence {
    /// Creates a sequence after checking that every extrude references a
    /// preceding sketch.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::DanglingSketchReference`] for a forward,
    /// out-of-range or non-sketch reference.
    pub fn new(operations: Vec<Operation>) -> Result<Self, SequenceError> {
        for (index, op) in operations.iter().enumerate() {
            if let Operation::Extrude(ext) = op {
                let ok = ext.sketch < index
                    && matches!(operations.get(ext.sketch), Some(Operation::Sketch(_)));
                if !ok {
                    return Err(SequenceError::DanglingSketchReference {
                        operation: index,
                        target: ext.sketch,
                    });
                }
            }
        }
        Ok(Self { operations })
    }

    /// Returns the operations in order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Whether the sequence has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterates extrudes with their operation index and resolved sketch.
    pub fn extrusions(&self) -> impl Iterator<Item = (usize, &Extrude, &Sketch)> + '_ {
        self.operations
            .iter()
            .enumerate()
            .filter_map(move |(index, op)| match op {
                Operation::Extrude(ext) => match self.operations.get(ext.sketch) {
                    Some(Operation::Sketch(sketch)) => Some((index, ext, sketch)),
                    _ => None,
                },
                Operation::Sketch(_) => None,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sketch() -> Sketch {
        Sketch {
            plane: SketchPlane::default(),
            scale: 1.0,
            loops: vec![Loop {
                curves: vec![Curve::Circle {
                    center: Point2::new(0.0, 0.0),
                    radius: 1.0,
                }],
            }],
        }
    }

    fn extrude(sketch: usize, extent_type: ExtentType, e1: f64, e2: f64) -> Extrude {
        Extrude {
            sketch,
            extent_one: e1,
            extent_two: e2,
            extent_type,
            boolean: BooleanKind::NewBody,
        }
    }

    #[test]
    fn spans_follow_extent_type() {
        assert_eq!(extrude(0, ExtentType::OneSide, 2.0, 9.0).span(), (0.0, 2.0));
        assert_eq!(extrude(0, ExtentType::OneSide, -2.0, 0.0).span(), (-2.0, 0.0));
        assert_eq!(extrude(0, ExtentType::Symmetric, -3.0, 0.0).span(), (-3.0, 3.0));
        assert_eq!(extrude(0, ExtentType::TwoSides, 1.0, 0.5).span(), (-0.5, 1.0));
    }

    #[test]
    fn forward_reference_is_rejected() {
        let err = CadSequence::new(vec![
            Operation::Extrude(extrude(1, ExtentType::OneSide, 1.0, 0.0)),
            Operation::Sketch(sketch()),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            SequenceError::DanglingSketchReference { operation: 0, target: 1 }
        ));
    }

    #[test]
    fn extrude_to_extrude_reference_is_rejected() {
        let err = CadSequence::new(vec![
            Operation::Sketch(sketch()),
            Operation::Extrude(extrude(0, ExtentType::OneSide, 1.0, 0.0)),
            Operation::Extrude(extrude(1, ExtentType::OneSide, 1.0, 0.0)),
        ])
        .unwrap_err();
        assert!(matches!(err, SequenceError::DanglingSketchReference { .. }));
    }

    #[test]
    fn extrusions_resolve_sketches() {
        let seq = CadSequence::new(vec![
            Operation::Sketch(sketch()),
            Operation::Extrude(extrude(0, ExtentType::OneSide, 1.0, 0.0)),
        ])
        .unwrap();
        let found: Vec<usize> = seq.extrusions().map(|(i, _, _)| i).collect();
        assert_eq!(found, vec![1]);
        assert!(CadSequence::default().is_empty());
    }
}
