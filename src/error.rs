use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;
use crate::validity::ValidityWarning;

/// Top-level error type for the cadvec pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Meshing(#[from] MeshingError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("solid rejected by validity policy: {0}")]
    ValidityRejected(ValidityWarning),

    #[error("profile cannot be swept: {0}")]
    InvalidProfile(ValidityWarning),

    #[error("unsupported request: {0}")]
    UnsupportedRequest(String),

    #[error("illegal stage transition {from} -> {to}")]
    IllegalTransition { from: Stage, to: Stage },
}

/// Classification surfaced to callers of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedSequence,
    ReconstructionError,
    ValidityWarning,
    MeshingFailed,
    WriteError,
    UnsupportedRequest,
    TransformFailed,
    Internal,
}

impl Error {
    /// Returns the classified kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Sequence(_) | Self::Container(_) => ErrorKind::MalformedSequence,
            Self::Reconstruction(_) => ErrorKind::ReconstructionError,
            Self::Topology(_) | Self::IllegalTransition { .. } => ErrorKind::Internal,
            Self::Meshing(_) => ErrorKind::MeshingFailed,
            Self::Write(_) => ErrorKind::WriteError,
            Self::Transform(_) => ErrorKind::TransformFailed,
            Self::ValidityRejected(_) | Self::InvalidProfile(_) => ErrorKind::ValidityWarning,
            Self::UnsupportedRequest(_) => ErrorKind::UnsupportedRequest,
        }
    }
}

/// Errors raised while turning a vector into a CAD sequence and back.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("record {record}: unrecognized command discriminant {value}")]
    UnknownCommand { record: usize, value: f64 },

    #[error("record {record}: missing required argument `{argument}` for {command}")]
    MissingArgument {
        record: usize,
        command: &'static str,
        argument: &'static str,
    },

    #[error("record {record}: argument `{argument}` = {value} is outside the quantization range")]
    ArgumentOutOfRange {
        record: usize,
        argument: &'static str,
        value: f64,
    },

    #[error("record {record}: {command} appears outside of a sketch loop")]
    CurveOutsideLoop { record: usize, command: &'static str },

    #[error("vector length {len} is not a multiple of the record width {width}")]
    RaggedVector { len: usize, width: usize },

    #[error(
        "operation {operation}: extrude references operation {target}, \
         which is not a preceding sketch"
    )]
    DanglingSketchReference { operation: usize, target: usize },
}

/// Errors reading or writing the named-array container.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container is not a valid named-array document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("dataset `{0}` not found")]
    MissingDataset(String),

    #[error("dataset `{name}` has shape {shape:?} but {len} values")]
    ShapeMismatch {
        name: String,
        shape: Vec<usize>,
        len: usize,
    },

    #[error("dataset `{name}` contains a non-finite value at index {index}")]
    NonFinite { name: String, index: usize },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("container format `{0}` is not supported by this build")]
    UnsupportedFormat(&'static str),

    #[error("HDF5 container error: {0}")]
    Hdf5(String),
}

/// Errors raised while building a solid from a CAD sequence.
#[derive(Debug, Error)]
pub enum ReconstructionError {
    #[error("operation {operation}: sketch has no curves")]
    EmptySketch { operation: usize },

    #[error("operation {operation}: degenerate profile: {reason}")]
    DegenerateProfile { operation: usize, reason: String },

    #[error("operation {operation}: extrusion distance is zero")]
    ZeroDistance { operation: usize },

    #[error("operation {operation}: boolean combination leaves zero volume")]
    ZeroVolume { operation: usize },

    #[error("operation {operation}: probe tessellation failed: {reason}")]
    Probe { operation: usize, reason: String },
}

/// Errors related to the topology arena.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(&'static str),

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Errors related to tessellation.
#[derive(Debug, Error)]
pub enum MeshingError {
    #[error("deflection must be a positive finite number, got {0}")]
    InvalidDeflection(f64),

    #[error("tessellation produced no triangles")]
    NoTriangles,

    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Errors persisting an artifact.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("refusing to write an empty mesh to {0}")]
    EmptyMesh(PathBuf),

    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot publish {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors raised by the latent transform.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("latent vector has {actual} values, the model expects {expected}")]
    LatentWidth { expected: usize, actual: usize },

    #[error("sequence has {records} meaningful records, the model accepts at most {max}")]
    SequenceTooLong { records: usize, max: usize },

    #[error("packed sequence needs {packed} values, the latent holds {capacity}")]
    LatentOverflow { packed: usize, capacity: usize },

    #[error("weights `{name}` have shape {actual:?}, expected {expected:?}")]
    WeightShape {
        name: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("invalid transform configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Errors loading the service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Convenience type alias for results using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
