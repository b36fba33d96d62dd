//! Request orchestration: parse, reconstruct, validate, mesh, export and
//! the latent round trip, driven by an explicit stage machine.

pub mod artifact;
mod state;

pub use artifact::{Area, Artifact, ArtifactKind, Storage};
pub use state::{Stage, StageTrail};

use std::sync::Arc;

use nalgebra::DVector;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::container::{ContainerFormat, NamedArrays, LATENT_DATASET};
use crate::error::{Error, ErrorKind, Result, TransformError};
use crate::export::ArtifactWriter;
use crate::latent::{LatentModel, LatentVector};
use crate::reconstruct::Reconstructor;
use crate::sequence::{CadSequenceVector, SequenceCodec};
use crate::tessellation::{tessellate, TriangleMesh};
use crate::validity::{self, ValidityPolicy};

/// What a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Vector to mesh.
    Export,
    /// Same as [`RequestKind::Export`].
    H5ToVis,
    /// Vector to latent.
    Encode,
    /// Latent to vector.
    Decode,
    /// Vector to latent to vector to mesh.
    EncodeDecode,
}

impl RequestKind {
    pub const ALL: [Self; 5] = [
        Self::Export,
        Self::H5ToVis,
        Self::Encode,
        Self::Decode,
        Self::EncodeDecode,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::H5ToVis => "h5_to_vis",
            Self::Encode => "encode",
            Self::Decode => "decode",
            Self::EncodeDecode => "encode_decode",
        }
    }

    /// Parses a kind name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedRequest`] for an unknown name.
    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| Error::UnsupportedRequest(format!("unknown request kind `{name}`")))
    }
}

/// One uploaded file and what to do with it.
#[derive(Debug, Clone)]
pub struct Request {
    pub kind: RequestKind,
    /// Client-supplied file name; only its base name is used.
    pub file_name: String,
    /// Declared container format.
    pub file_format: String,
    /// Chord deflection; the configured default applies when absent.
    pub deflection: Option<f64>,
    pub bytes: Vec<u8>,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub kind: RequestKind,
    pub artifacts: Vec<Artifact>,
    pub warnings: Vec<String>,
    pub trail: Vec<Stage>,
    pub triangle_count: Option<usize>,
}

impl PipelineOutcome {
    /// The mesh artifact, if the run produced one.
    #[must_use]
    pub fn mesh(&self) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == ArtifactKind::Mesh)
    }
}

/// A run that ended in [`Stage::Failed`].
#[derive(Debug, Error)]
#[error("{stage} stage failed: {error}")]
pub struct PipelineError {
    /// The stage that was being entered.
    pub stage: Stage,
    pub error: Error,
    pub trail: Vec<Stage>,
}

impl PipelineError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Settings that shape every run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Accepted `file_format` values.
    pub container_formats: Vec<ContainerFormat>,
    pub default_deflection: f64,
    pub validity_policy: ValidityPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            container_formats: available_formats(),
            default_deflection: 0.1,
            validity_policy: ValidityPolicy::Warn,
        }
    }
}

/// Container formats this build can read and write.
#[must_use]
pub fn available_formats() -> Vec<ContainerFormat> {
    ContainerFormat::ALL
        .into_iter()
        .filter(|f| f.is_available())
        .collect()
}

/// Runs requests against the storage areas. Shareable across threads.
#[derive(Debug)]
pub struct Pipeline {
    storage: Storage,
    writer: ArtifactWriter,
    codec: SequenceCodec,
    reconstructor: Reconstructor,
    model: Arc<LatentModel>,
    settings: PipelineSettings,
}

impl Pipeline {
    /// Creates the pipeline and its storage areas.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if an area cannot be created.
    pub fn new(
        storage: Storage,
        codec: SequenceCodec,
        reconstructor: Reconstructor,
        model: Arc<LatentModel>,
        settings: PipelineSettings,
    ) -> Result<Self> {
        storage.ensure()?;
        Ok(Self {
            storage,
            writer: ArtifactWriter::new(),
            codec,
            reconstructor,
            model,
            settings,
        })
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Runs one request to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] naming the failed stage. Artifacts of
    /// stages that completed before the failure are kept; the failed stage
    /// publishes nothing.
    pub fn run(&self, request: &Request) -> std::result::Result<PipelineOutcome, PipelineError> {
        let mut run = Run {
            pipeline: self,
            request,
            trail: StageTrail::new(),
            format: ContainerFormat::Json,
            artifacts: Vec::new(),
            warnings: Vec::new(),
            triangle_count: None,
        };
        info!(request = request.kind.name(), file = %request.file_name, "pipeline started");
        match run.execute() {
            Ok(()) => {
                info!(
                    request = request.kind.name(),
                    artifacts = run.artifacts.len(),
                    warnings = run.warnings.len(),
                    "pipeline finished"
                );
                Ok(PipelineOutcome {
                    kind: request.kind,
                    artifacts: run.artifacts,
                    warnings: run.warnings,
                    trail: run.trail.into_stages(),
                    triangle_count: run.triangle_count,
                })
            }
            Err((stage, error)) => {
                let _ = run.trail.advance(Stage::Failed);
                warn!(
                    request = request.kind.name(),
                    %stage,
                    kind = ?error.kind(),
                    %error,
                    "pipeline failed"
                );
                Err(PipelineError {
                    stage,
                    error,
                    trail: run.trail.into_stages(),
                })
            }
        }
    }
}

type StageResult<T> = std::result::Result<T, (Stage, Error)>;

struct Run<'a> {
    pipeline: &'a Pipeline,
    request: &'a Request,
    trail: StageTrail,
    /// Format of the upload, which every container artifact follows.
    format: ContainerFormat,
    artifacts: Vec<Artifact>,
    warnings: Vec<String>,
    triangle_count: Option<usize>,
}

impl Run<'_> {
    fn execute(&mut self) -> StageResult<()> {
        let stem = self.admit().map_err(|e| (Stage::Received, e))?;
        match self.request.kind {
            RequestKind::Export | RequestKind::H5ToVis => {
                let vector = self.stage(Stage::Parsed, |run| run.parse_vector())?;
                self.mesh(&vector, &artifact::mesh_name(&stem))?;
            }
            RequestKind::Encode => {
                let vector = self.stage(Stage::Parsed, |run| run.parse_vector())?;
                self.stage(Stage::Encoded, |run| run.encode(&vector, &stem))?;
            }
            RequestKind::Decode => {
                let latent = self.stage(Stage::Parsed, |run| run.parse_latent())?;
                self.stage(Stage::Decoded, |run| run.decode(&latent, &stem))?;
            }
            RequestKind::EncodeDecode => {
                let vector = self.stage(Stage::Parsed, |run| run.parse_vector())?;
                let latent = self.stage(Stage::Encoded, |run| run.encode(&vector, &stem))?;
                let decoded = self.stage(Stage::Decoded, |run| run.decode(&latent, &stem))?;
                self.mesh(&decoded, &artifact::decoded_mesh_name(&stem))?;
            }
        }
        self.stage(Stage::Done, |_| Ok(()))
    }

    /// Checks the transition, runs `f` and enters `stage` on success.
    fn stage<T>(&mut self, stage: Stage, f: impl FnOnce(&mut Self) -> Result<T>) -> StageResult<T> {
        let from = self.trail.current();
        if !from.can_advance(stage) {
            return Err((stage, Error::IllegalTransition { from, to: stage }));
        }
        let value = f(self).map_err(|e| (stage, e))?;
        self.trail.advance(stage).map_err(|e| (stage, e))?;
        debug!(request = self.request.kind.name(), %stage, "stage complete");
        Ok(value)
    }

    fn mesh(&mut self, vector: &CadSequenceVector, name: &str) -> StageResult<()> {
        let solid = self.stage(Stage::Reconstructed, |run| {
            let sequence = run.pipeline.codec.to_sequence(vector)?;
            run.pipeline.reconstructor.reconstruct(&sequence)
        })?;
        self.stage(Stage::Validated, |run| {
            let report = validity::check(&solid)?;
            let warnings = run.pipeline.settings.validity_policy.apply(report)?;
            run.warnings.extend(warnings.iter().map(ToString::to_string));
            Ok(())
        })?;
        let deflection = self
            .request
            .deflection
            .unwrap_or(self.pipeline.settings.default_deflection);
        let mesh = self.stage(Stage::Meshed, |run| {
            let mesh = tessellate(&solid, deflection)?;
            run.check_mesh(&mesh)?;
            Ok(mesh)
        })?;
        self.stage(Stage::Exported, |run| run.export(&mesh, name))
    }

    /// Applies the validity policy to the edge pairing of the mesh that
    /// will be exported.
    fn check_mesh(&mut self, mesh: &TriangleMesh) -> Result<()> {
        let report = validity::ValidityReport {
            warnings: validity::check_mesh(mesh)
                .into_iter()
                .map(|issue| validity::ValidityWarning {
                    operation: None,
                    issue,
                })
                .collect(),
        };
        let warnings = self.pipeline.settings.validity_policy.apply(report)?;
        for warning in warnings.iter().map(ToString::to_string) {
            if !self.warnings.contains(&warning) {
                self.warnings.push(warning);
            }
        }
        Ok(())
    }

    fn admit(&mut self) -> Result<String> {
        let (req, pipeline) = (self.request, self.pipeline);
        let accepted = &pipeline.settings.container_formats;
        self.format = ContainerFormat::from_tag(&req.file_format)
            .filter(|f| f.is_available() && accepted.contains(f))
            .ok_or_else(|| {
                let tags: Vec<&str> = accepted.iter().map(|f| f.tag()).collect();
                Error::UnsupportedRequest(format!(
                    "file_format `{}` is not supported, expected one of {tags:?}",
                    req.file_format
                ))
            })?;
        let name = req
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        let suffix = match req.kind {
            RequestKind::Decode => format!("_zs.{}", self.format.extension()),
            _ => format!(".{}", self.format.extension()),
        };
        if name.len() <= suffix.len() || !name.ends_with(&suffix) {
            return Err(Error::UnsupportedRequest(format!(
                "file `{name}` must end in `{suffix}`"
            )));
        }
        let path = self.pipeline.storage.path(Area::Uploaded, name);
        self.pipeline.writer.write_bytes(&path, &req.bytes)?;
        Ok(artifact::stem(name).to_string())
    }

    fn parse_vector(&self) -> Result<CadSequenceVector> {
        let vector = self.pipeline.codec.decode_as(self.format, &self.request.bytes)?;
        // Reject malformed records before any geometry is built.
        self.pipeline.codec.to_sequence(&vector)?;
        Ok(vector)
    }

    fn parse_latent(&self) -> Result<LatentVector> {
        let doc = NamedArrays::decode(self.format, &self.request.bytes)?;
        let ds = doc.get(LATENT_DATASET)?;
        Ok(DVector::from_column_slice(&ds.data))
    }

    fn encode(&mut self, vector: &CadSequenceVector, stem: &str) -> Result<LatentVector> {
        let latent = self.pipeline.model.encode_vector(vector)?;
        let mut doc = NamedArrays::new();
        doc.insert(LATENT_DATASET, vec![1, latent.len()], latent.as_slice().to_vec())
            .map_err(TransformError::from)?;
        let bytes = doc.encode(self.format).map_err(TransformError::from)?;
        let name = artifact::latent_name(stem, self.format);
        self.publish(ArtifactKind::Latent, Area::Latent, &name, &bytes)?;
        Ok(latent)
    }

    fn decode(&mut self, latent: &LatentVector, stem: &str) -> Result<CadSequenceVector> {
        let vector = self.pipeline.model.decode_vector(latent)?;
        let bytes = self.pipeline.codec.encode_as(self.format, &vector)?;
        self.publish(
            ArtifactKind::DecodedVector,
            Area::Decoded,
            &artifact::decoded_name(stem, self.format),
            &bytes,
        )?;
        Ok(vector)
    }

    fn export(&mut self, mesh: &TriangleMesh, name: &str) -> Result<()> {
        let path = self.pipeline.storage.path(Area::Stl, name);
        self.pipeline.writer.export_stl(mesh, &path)?;
        self.triangle_count = Some(mesh.triangle_count());
        info!(artifact = name, triangles = mesh.triangle_count(), "mesh exported");
        self.artifacts.push(Artifact {
            kind: ArtifactKind::Mesh,
            name: name.to_string(),
            path,
        });
        Ok(())
    }

    fn publish(&mut self, kind: ArtifactKind, area: Area, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.pipeline.storage.path(area, name);
        self.pipeline.writer.write_bytes(&path, bytes)?;
        info!(artifact = name, ?kind, "artifact published");
        self.artifacts.push(Artifact {
            kind,
            name: name.to_string(),
            path,
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::latent::TransformConfig;
    use crate::sequence::{command_record, Command, Quantization, Record, RECORD_WIDTH};

    fn line(x: f64, y: f64) -> Record {
        let mut r = command_record(Command::Line);
        r[1] = x;
        r[2] = y;
        r
    }

    fn ext() -> Record {
        let mut r = command_record(Command::Ext);
        for &col in Command::Ext.arguments() {
            r[col] = 128.0;
        }
        r[13] = 160.0;
        r[15] = 0.0;
        r[16] = 0.0;
        r
    }

    fn square() -> CadSequenceVector {
        CadSequenceVector::new(vec![
            command_record(Command::Sol),
            line(192.0, 64.0),
            line(192.0, 192.0),
            line(64.0, 192.0),
            line(64.0, 64.0),
            ext(),
            command_record(Command::Eos),
        ])
    }

    fn pipeline(root: &std::path::Path) -> Pipeline {
        let model = LatentModel::spectral(TransformConfig {
            max_total_len: 8,
            latent_dim: 8 * RECORD_WIDTH,
            quantization: Quantization::default(),
        })
        .unwrap();
        Pipeline::new(
            Storage::new(root),
            SequenceCodec::default(),
            Reconstructor::default(),
            Arc::new(model),
            PipelineSettings::default(),
        )
        .unwrap()
    }

    fn request(kind: RequestKind, file_name: &str, bytes: Vec<u8>) -> Request {
        Request {
            kind,
            file_name: file_name.to_string(),
            file_format: "json".to_string(),
            deflection: None,
            bytes,
        }
    }

    fn square_bytes() -> Vec<u8> {
        SequenceCodec::default().encode(&square()).unwrap()
    }

    fn files(dir: std::path::PathBuf) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    // ── Export ──────────────────────────────────────────────────────

    #[test]
    fn export_publishes_a_mesh() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let outcome = p
            .run(&request(RequestKind::Export, "square.json", square_bytes()))
            .unwrap();

        let mesh = outcome.mesh().unwrap();
        assert_eq!(mesh.name, "square.stl");
        assert!(mesh.path.is_file());
        assert!(outcome.triangle_count.unwrap() >= 12);
        assert!(outcome.warnings.is_empty());
        assert_eq!(
            outcome.trail,
            vec![
                Stage::Received,
                Stage::Parsed,
                Stage::Reconstructed,
                Stage::Validated,
                Stage::Meshed,
                Stage::Exported,
                Stage::Done,
            ]
        );
        assert_eq!(files(p.storage().dir(Area::Uploaded)), vec!["square.json"]);
    }

    #[test]
    fn unknown_command_fails_without_a_mesh() {
        let mut records = square().records().to_vec();
        records[0][0] = 9.0;
        let bytes = SequenceCodec::default()
            .encode(&CadSequenceVector::new(records))
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());

        let err = p
            .run(&request(RequestKind::H5ToVis, "bad.json", bytes))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedSequence);
        assert_eq!(err.stage, Stage::Parsed);
        assert_eq!(err.trail.last(), Some(&Stage::Failed));
        assert!(files(p.storage().dir(Area::Stl)).is_empty());
    }

    #[test]
    fn invalid_deflection_fails_at_meshing() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let mut req = request(RequestKind::Export, "square.json", square_bytes());
        req.deflection = Some(0.0);

        let err = p.run(&req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MeshingFailed);
        assert_eq!(err.stage, Stage::Meshed);
        assert!(files(p.storage().dir(Area::Stl)).is_empty());
    }

    // ── Request admission ───────────────────────────────────────────

    #[test]
    fn unsupported_format_and_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());

        let mut req = request(RequestKind::Export, "square.json", square_bytes());
        req.file_format = "xml".to_string();
        let err = p.run(&req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedRequest);
        assert_eq!(err.stage, Stage::Received);

        let err = p
            .run(&request(RequestKind::Export, "square.h5", square_bytes()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedRequest);

        let err = p
            .run(&request(RequestKind::Decode, "square.json", square_bytes()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedRequest);
        assert!(files(p.storage().dir(Area::Uploaded)).is_empty());
    }

    #[test]
    fn disabled_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(dir.path());
        p.settings.container_formats = vec![ContainerFormat::Hdf5];
        let err = p
            .run(&request(RequestKind::Export, "square.json", square_bytes()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedRequest);
        assert_eq!(err.stage, Stage::Received);
    }

    #[test]
    fn request_kinds_parse_by_name() {
        assert_eq!(RequestKind::parse("h5_to_vis").unwrap(), RequestKind::H5ToVis);
        assert_eq!(
            RequestKind::parse("encode_decode").unwrap(),
            RequestKind::EncodeDecode
        );
        assert!(matches!(
            RequestKind::parse("render"),
            Err(Error::UnsupportedRequest(_))
        ));
    }

    /// Records of an axis-aligned box in unscaled continuous units.
    fn continuous_box(min: (f64, f64), max: (f64, f64), depth: f64, boolean: f64) -> Vec<Record> {
        let mut records = vec![command_record(Command::Sol)];
        for (x, y) in [(max.0, min.1), max, (min.0, max.1), min] {
            records.push(line(x, y));
        }
        let mut e = command_record(Command::Ext);
        for &col in Command::Ext.arguments() {
            e[col] = 0.0;
        }
        e[12] = 1.0;
        e[13] = depth;
        e[15] = boolean;
        records.push(e);
        records
    }

    fn continuous_pipeline(root: &std::path::Path, policy: ValidityPolicy) -> Pipeline {
        let model = LatentModel::spectral(TransformConfig::default()).unwrap();
        Pipeline::new(
            Storage::new(root),
            SequenceCodec::new(Quantization::Continuous),
            Reconstructor::default(),
            Arc::new(model),
            PipelineSettings {
                validity_policy: policy,
                ..PipelineSettings::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn continuous_box_exports_its_bounding_box() {
        let mut records = continuous_box((0.0, 0.0), (4.0, 3.0), 10.0, 0.0);
        records.push(command_record(Command::Eos));
        let codec = SequenceCodec::new(Quantization::Continuous);
        let bytes = codec.encode(&CadSequenceVector::new(records)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let p = continuous_pipeline(dir.path(), ValidityPolicy::Warn);
        let outcome = p.run(&request(RequestKind::Export, "box.json", bytes)).unwrap();
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

        let mut file = std::fs::File::open(&outcome.mesh().unwrap().path).unwrap();
        let stl = stl_io::read_stl(&mut file).unwrap();
        let (mut min, mut max) = ([f32::MAX; 3], [f32::MIN; 3]);
        for v in &stl.vertices {
            for k in 0..3 {
                min[k] = min[k].min(v[k]);
                max[k] = max[k].max(v[k]);
            }
        }
        for (got, want) in min.iter().zip([0.0, 0.0, 0.0]) {
            assert!((got - want).abs() < 1e-4, "min {min:?}");
        }
        for (got, want) in max.iter().zip([4.0, 3.0, 10.0]) {
            assert!((got - want).abs() < 1e-4, "max {max:?}");
        }
    }

    #[test]
    fn edge_touching_boxes_follow_the_validity_policy() {
        let mut records = continuous_box((0.0, 0.0), (1.0, 1.0), 1.0, 0.0);
        records.extend(continuous_box((1.0, 1.0), (2.0, 2.0), 1.0, 1.0));
        records.push(command_record(Command::Eos));
        let bytes = SequenceCodec::new(Quantization::Continuous)
            .encode(&CadSequenceVector::new(records))
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let warned = continuous_pipeline(dir.path(), ValidityPolicy::Warn)
            .run(&request(RequestKind::Export, "touch.json", bytes.clone()))
            .unwrap();
        assert!(!warned.warnings.is_empty());
        assert!(warned.mesh().is_some());

        let dir = tempfile::tempdir().unwrap();
        let p = continuous_pipeline(dir.path(), ValidityPolicy::Reject);
        let err = p
            .run(&request(RequestKind::Export, "touch.json", bytes))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidityWarning);
        assert_eq!(err.stage, Stage::Validated);
        assert!(files(p.storage().dir(Area::Stl)).is_empty());
    }

    // ── Latent round trip ───────────────────────────────────────────

    #[test]
    fn encode_then_decode_restores_the_vector() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let encoded = p
            .run(&request(RequestKind::Encode, "square.json", square_bytes()))
            .unwrap();
        assert_eq!(encoded.artifacts.len(), 1);
        assert_eq!(encoded.artifacts[0].name, "square_zs.json");
        assert!(encoded.triangle_count.is_none());

        let latent = std::fs::read(&encoded.artifacts[0].path).unwrap();
        let decoded = p
            .run(&request(RequestKind::Decode, "square_zs.json", latent))
            .unwrap();
        assert_eq!(decoded.artifacts[0].name, "square_dec.json");
        assert_eq!(
            decoded.trail,
            vec![Stage::Received, Stage::Parsed, Stage::Decoded, Stage::Done]
        );

        let bytes = std::fs::read(&decoded.artifacts[0].path).unwrap();
        let vector = SequenceCodec::default().decode(&bytes).unwrap();
        assert_eq!(vector.len(), 8);
        assert_eq!(vector.records()[..7], square().records()[..]);
    }

    #[test]
    fn default_transform_encode_decode_meshes_the_square() {
        let dir = tempfile::tempdir().unwrap();
        let model = LatentModel::spectral(TransformConfig::default()).unwrap();
        let p = Pipeline::new(
            Storage::new(dir.path()),
            SequenceCodec::default(),
            Reconstructor::default(),
            Arc::new(model),
            PipelineSettings::default(),
        )
        .unwrap();
        let outcome = p
            .run(&request(RequestKind::EncodeDecode, "square.json", square_bytes()))
            .unwrap();
        assert_eq!(outcome.trail.last(), Some(&Stage::Done));
        assert!(outcome.triangle_count.unwrap() >= 12);

        let decoded = outcome
            .artifacts
            .iter()
            .find(|a| a.kind == ArtifactKind::DecodedVector)
            .unwrap();
        let vector = SequenceCodec::default()
            .decode(&std::fs::read(&decoded.path).unwrap())
            .unwrap();
        assert_eq!(vector.len(), 60);
        assert_eq!(vector.records()[..7], square().records()[..]);
    }

    #[cfg(feature = "hdf5")]
    #[test]
    fn h5_uploads_produce_h5_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let bytes = SequenceCodec::default()
            .encode_as(ContainerFormat::Hdf5, &square())
            .unwrap();
        let mut req = request(RequestKind::EncodeDecode, "square.h5", bytes);
        req.file_format = "h5".to_string();
        let outcome = p.run(&req).unwrap();
        let names: Vec<&str> = outcome.artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["square_zs.h5", "square_dec.h5", "square_dec.stl"]);

        let latent = NamedArrays::read(&outcome.artifacts[0].path).unwrap();
        assert_eq!(latent.get(LATENT_DATASET).unwrap().shape, vec![1, 8 * RECORD_WIDTH]);
    }

    #[test]
    fn encode_decode_keeps_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let outcome = p
            .run(&request(RequestKind::EncodeDecode, "square.json", square_bytes()))
            .unwrap();

        let kinds: Vec<ArtifactKind> = outcome.artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![ArtifactKind::Latent, ArtifactKind::DecodedVector, ArtifactKind::Mesh]
        );
        assert_eq!(outcome.mesh().unwrap().name, "square_dec.stl");
        assert!(outcome.triangle_count.unwrap() > 0);
        for artifact in &outcome.artifacts {
            assert!(artifact.path.is_file(), "{} missing", artifact.name);
        }
        assert_eq!(files(p.storage().dir(Area::Uploaded)), vec!["square.json"]);
    }
}
