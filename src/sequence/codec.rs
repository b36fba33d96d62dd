use tracing::debug;

use crate::container::{ContainerFormat, NamedArrays, VECTOR_DATASET, VECTOR_DATASET_FALLBACK};
use crate::error::{ContainerError, SequenceError};
use crate::math::{Point2, Point3};

use super::quantize::{ArgKind, Quantization};
use super::vector::{
    command_record, discrete, is_padding, CadSequenceVector, Command, Record, COLUMN_NAMES,
    COL_ALPHA, COL_BOOLEAN, COL_CMD, COL_E1, COL_E2, COL_EXTENT_TYPE, COL_FLAG, COL_GAMMA,
    COL_PHI, COL_PX, COL_PY, COL_PZ, COL_RADIUS, COL_SCALE, COL_THETA, COL_X, COL_Y, PAD_VALUE,
    RECORD_WIDTH,
};
use super::{
    BooleanKind, CadSequence, Curve, ExtentType, Extrude, Loop, Operation, Sketch, SketchPlane,
};

/// Converts between vector records and structured CAD sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceCodec {
    quantization: Quantization,
}

#[derive(Debug, Clone, Copy)]
enum RowShape {
    Line,
    Arc { sweep: f64, counter_clockwise: bool },
    Circle { radius: f64 },
}

#[derive(Debug, Clone, Copy)]
struct CurveRow {
    shape: RowShape,
    point: Point2,
}

impl SequenceCodec {
    /// Creates a codec with the given quantization.
    #[must_use]
    pub fn new(quantization: Quantization) -> Self {
        Self { quantization }
    }

    /// Returns the quantization in use.
    #[must_use]
    pub fn quantization(&self) -> Quantization {
        self.quantization
    }

    /// Reads a vector from JSON container bytes.
    ///
    /// # Errors
    ///
    /// As [`SequenceCodec::decode_as`].
    pub fn decode(&self, bytes: &[u8]) -> Result<CadSequenceVector, ContainerError> {
        self.decode_as(ContainerFormat::Json, bytes)
    }

    /// Reads a vector from container bytes (`out_vec`, else `vec`).
    ///
    /// # Errors
    ///
    /// Returns a [`ContainerError`] if the document is invalid or holds no
    /// vector dataset, or one whose row width is not 17.
    pub fn decode_as(
        &self,
        format: ContainerFormat,
        bytes: &[u8],
    ) -> Result<CadSequenceVector, ContainerError> {
        let doc = NamedArrays::decode(format, bytes)?;
        let ds = doc.get_any(&[VECTOR_DATASET, VECTOR_DATASET_FALLBACK])?;
        if ds.shape.last().copied() != Some(RECORD_WIDTH) && !ds.data.is_empty() {
            return Err(ContainerError::ShapeMismatch {
                name: VECTOR_DATASET.to_string(),
                shape: ds.shape.clone(),
                len: ds.data.len(),
            });
        }
        let mut records = Vec::with_capacity(ds.data.len() / RECORD_WIDTH);
        for chunk in ds.data.chunks_exact(RECORD_WIDTH) {
            let mut record = [PAD_VALUE; RECORD_WIDTH];
            record.copy_from_slice(chunk);
            records.push(record);
        }
        Ok(CadSequenceVector::new(records))
    }

    /// Writes a vector to JSON container bytes.
    ///
    /// # Errors
    ///
    /// As [`SequenceCodec::encode_as`].
    pub fn encode(&self, vector: &CadSequenceVector) -> Result<Vec<u8>, ContainerError> {
        self.encode_as(ContainerFormat::Json, vector)
    }

    /// Writes a vector to container bytes under `out_vec`.
    ///
    /// # Errors
    ///
    /// Returns a [`ContainerError`] if a value is not finite or the format
    /// is unavailable.
    pub fn encode_as(
        &self,
        format: ContainerFormat,
        vector: &CadSequenceVector,
    ) -> Result<Vec<u8>, ContainerError> {
        let mut doc = NamedArrays::new();
        doc.insert(
            VECTOR_DATASET,
            vec![vector.len(), RECORD_WIDTH],
            vector.to_flat(),
        )?;
        doc.encode(format)
    }

    /// Interprets vector records as a CAD sequence.
    ///
    /// Padding records are skipped and decoding stops at the first EOS.
    /// Loops left without a closing extrusion are dropped.
    ///
    /// # Errors
    ///
    /// Returns a [`SequenceError`] on an unknown command, a missing or
    /// out-of-range argument, or a curve outside a loop.
    pub fn to_sequence(&self, vector: &CadSequenceVector) -> Result<CadSequence, SequenceError> {
        let mut operations = Vec::new();
        let mut loops: Vec<Vec<CurveRow>> = Vec::new();

        for (record, row) in vector.records().iter().enumerate() {
            if is_padding(row) {
                continue;
            }
            let command =
                Command::from_value(row[COL_CMD]).ok_or(SequenceError::UnknownCommand {
                    record,
                    value: row[COL_CMD],
                })?;
            match command {
                Command::Eos => break,
                Command::Sol => loops.push(Vec::new()),
                Command::Line | Command::Arc | Command::Circle => {
                    let curve = self.parse_curve(record, command, row)?;
                    let current = loops.last_mut().ok_or(SequenceError::CurveOutsideLoop {
                        record,
                        command: command.name(),
                    })?;
                    current.push(curve);
                }
                Command::Ext => {
                    let (plane, scale, mut extrude) = self.parse_extrude(record, row)?;
                    let sketch = Sketch {
                        plane,
                        scale,
                        loops: loops.drain(..).map(|rows| build_loop(&rows)).collect(),
                    };
                    operations.push(Operation::Sketch(sketch));
                    extrude.sketch = operations.len() - 1;
                    operations.push(Operation::Extrude(extrude));
                }
            }
        }

        if !loops.is_empty() {
            debug!(dropped = loops.len(), "loops without a closing extrusion dropped");
        }
        CadSequence::new(operations)
    }

    /// Serializes a CAD sequence into vector records.
    ///
    /// Each extrusion is written as its sketch's loops followed by the
    /// extrusion record; a single EOS terminates the output.
    #[must_use]
    pub fn from_sequence(&self, sequence: &CadSequence) -> CadSequenceVector {
        let mut records = Vec::new();
        for (_, extrude, sketch) in sequence.extrusions() {
            for lp in &sketch.loops {
                records.push(command_record(Command::Sol));
                records.extend(lp.curves.iter().map(|c| self.curve_record(c)));
            }
            records.push(self.extrude_record(extrude, sketch));
        }
        records.push(command_record(Command::Eos));
        CadSequenceVector::new(records)
    }

    fn argument(
        &self,
        record: usize,
        command: Command,
        row: &Record,
        column: usize,
        kind: ArgKind,
    ) -> Result<f64, SequenceError> {
        let raw = row[column];
        if self.quantization.is_missing(raw) {
            return Err(SequenceError::MissingArgument {
                record,
                command: command.name(),
                argument: COLUMN_NAMES[column],
            });
        }
        if !self.quantization.in_range(raw) {
            return Err(SequenceError::ArgumentOutOfRange {
                record,
                argument: COLUMN_NAMES[column],
                value: raw,
            });
        }
        Ok(self.quantization.dequantize(kind, self.quantization.snap(raw)))
    }

    fn discrete_argument<T>(
        record: usize,
        command: Command,
        row: &Record,
        column: usize,
        parse: impl Fn(i64) -> Option<T>,
    ) -> Result<T, SequenceError> {
        let raw = row[column];
        if !raw.is_finite() || (raw - PAD_VALUE).abs() < 1e-6 {
            return Err(SequenceError::MissingArgument {
                record,
                command: command.name(),
                argument: COLUMN_NAMES[column],
            });
        }
        discrete(raw)
            .and_then(parse)
            .ok_or(SequenceError::ArgumentOutOfRange {
                record,
                argument: COLUMN_NAMES[column],
                value: raw,
            })
    }

    fn parse_curve(
        &self,
        record: usize,
        command: Command,
        row: &Record,
    ) -> Result<CurveRow, SequenceError> {
        let x = self.argument(record, command, row, COL_X, ArgKind::Coordinate)?;
        let y = self.argument(record, command, row, COL_Y, ArgKind::Coordinate)?;
        let shape = match command {
            Command::Arc => {
                let sweep = self.argument(record, command, row, COL_ALPHA, ArgKind::Sweep)?;
                let counter_clockwise =
                    Self::discrete_argument(record, command, row, COL_FLAG, |v| match v {
                        0 => Some(false),
                        1 => Some(true),
                        _ => None,
                    })?;
                RowShape::Arc {
                    sweep,
                    counter_clockwise,
                }
            }
            Command::Circle => RowShape::Circle {
                radius: self.argument(record, command, row, COL_RADIUS, ArgKind::Coordinate)?,
            },
            _ => RowShape::Line,
        };
        Ok(CurveRow {
            shape,
            point: Point2::new(x, y),
        })
    }

    fn parse_extrude(
        &self,
        record: usize,
        row: &Record,
    ) -> Result<(SketchPlane, f64, Extrude), SequenceError> {
        let cmd = Command::Ext;
        let arg = |column, kind| self.argument(record, cmd, row, column, kind);
        let plane = SketchPlane {
            origin: Point3::new(
                arg(COL_PX, ArgKind::Signed)?,
                arg(COL_PY, ArgKind::Signed)?,
                arg(COL_PZ, ArgKind::Signed)?,
            ),
            theta: arg(COL_THETA, ArgKind::Angle)?,
            phi: arg(COL_PHI, ArgKind::Angle)?,
            gamma: arg(COL_GAMMA, ArgKind::Angle)?,
        };
        let scale = arg(COL_SCALE, ArgKind::Scale)?;
        let extrude = Extrude {
            sketch: 0,
            extent_one: arg(COL_E1, ArgKind::Signed)?,
            extent_two: arg(COL_E2, ArgKind::Signed)?,
            boolean: Self::discrete_argument(
                record,
                cmd,
                row,
                COL_BOOLEAN,
                BooleanKind::from_index,
            )?,
            extent_type: Self::discrete_argument(
                record,
                cmd,
                row,
                COL_EXTENT_TYPE,
                ExtentType::from_index,
            )?,
        };
        Ok((plane, scale, extrude))
    }

    fn curve_record(&self, curve: &Curve) -> Record {
        let q = self.quantization;
        let (command, anchor) = match curve {
            Curve::Line { .. } => (Command::Line, curve.anchor()),
            Curve::Arc { .. } => (Command::Arc, curve.anchor()),
            Curve::Circle { .. } => (Command::Circle, curve.anchor()),
        };
        let mut row = command_record(command);
        row[COL_X] = q.quantize(ArgKind::Coordinate, anchor.x);
        row[COL_Y] = q.quantize(ArgKind::Coordinate, anchor.y);
        match curve {
            Curve::Arc {
                sweep,
                counter_clockwise,
                ..
            } => {
                row[COL_ALPHA] = q.quantize(ArgKind::Sweep, *sweep);
                row[COL_FLAG] = if *counter_clockwise { 1.0 } else { 0.0 };
            }
            Curve::Circle { radius, .. } => {
                row[COL_RADIUS] = q.quantize(ArgKind::Coordinate, *radius);
            }
            Curve::Line { .. } => {}
        }
        row
    }

    fn extrude_record(&self, extrude: &Extrude, sketch: &Sketch) -> Record {
        let q = self.quantization;
        let mut row = command_record(Command::Ext);
        row[COL_THETA] = q.quantize(ArgKind::Angle, sketch.plane.theta);
        row[COL_PHI] = q.quantize(ArgKind::Angle, sketch.plane.phi);
        row[COL_GAMMA] = q.quantize(ArgKind::Angle, sketch.plane.gamma);
        row[COL_PX] = q.quantize(ArgKind::Signed, sketch.plane.origin.x);
        row[COL_PY] = q.quantize(ArgKind::Signed, sketch.plane.origin.y);
        row[COL_PZ] = q.quantize(ArgKind::Signed, sketch.plane.origin.z);
        row[COL_SCALE] = q.quantize(ArgKind::Scale, sketch.scale);
        row[COL_E1] = q.quantize(ArgKind::Signed, extrude.extent_one);
        row[COL_E2] = q.quantize(ArgKind::Signed, extrude.extent_two);
        row[COL_BOOLEAN] = extrude.boolean.index();
        row[COL_EXTENT_TYPE] = extrude.extent_type.index();
        row
    }
}

/// Resolves start points: each curve starts where the previous one ended,
/// the first where the last one ended.
fn build_loop(rows: &[CurveRow]) -> Loop {
    let n = rows.len();
    let curves = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let start = rows[(i + n - 1) % n].point;
            match row.shape {
                RowShape::Line => Curve::Line {
                    start,
                    end: row.point,
                },
                RowShape::Arc {
                    sweep,
                    counter_clockwise,
                } => Curve::Arc {
                    start,
                    end: row.point,
                    sweep,
                    counter_clockwise,
                },
                RowShape::Circle { radius } => Curve::Circle {
                    center: row.point,
                    radius,
                },
            }
        })
        .collect();
    Loop { curves }
}
