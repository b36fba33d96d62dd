//! Linear latent transform between CAD sequence vectors and latent vectors.
//!
//! Records are packed before the affine map: each meaningful record
//! contributes its command followed by the arguments that command uses, and
//! the rest of the `latent_dim` buffer is filled with EOS. Decoding reverses
//! the map and walks the buffer record by record, so the command channel
//! survives as long as the default orthonormal basis is used.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info};

use crate::container::{ContainerFormat, NamedArrays};
use crate::error::{self, TransformError};
use crate::export::ArtifactWriter;
use crate::sequence::{
    command_record, discrete, CadSequenceVector, Command, Quantization, Record, COL_BOOLEAN,
    COL_CMD, COL_EXTENT_TYPE, COL_FLAG, RECORD_WIDTH,
};

const ENCODER_WEIGHT: &str = "encoder_weight";
const ENCODER_BIAS: &str = "encoder_bias";
const DECODER_WEIGHT: &str = "decoder_weight";
const DECODER_BIAS: &str = "decoder_bias";

/// Shape of the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformConfig {
    /// Records in every decoded vector.
    pub max_total_len: usize,
    /// Width of the latent vector.
    pub latent_dim: usize,
    /// Grid decoded arguments snap to.
    pub quantization: Quantization,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            max_total_len: 60,
            latent_dim: 256,
            quantization: Quantization::default(),
        }
    }
}

impl TransformConfig {
    /// Length of the flattened input vector.
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.max_total_len * RECORD_WIDTH
    }

    /// Length of the packed buffer the weights act on.
    #[must_use]
    pub fn packed_dim(&self) -> usize {
        self.latent_dim
    }

    fn validate(&self) -> Result<(), TransformError> {
        if self.max_total_len == 0 || self.latent_dim == 0 {
            return Err(TransformError::InvalidConfig(
                "max_total_len and latent_dim must be positive".into(),
            ));
        }
        if self.latent_dim > self.input_dim() {
            return Err(TransformError::InvalidConfig(format!(
                "latent_dim {} exceeds input width {}",
                self.latent_dim,
                self.input_dim()
            )));
        }
        Ok(())
    }
}

/// A fixed-length latent vector.
pub type LatentVector = DVector<f64>;

/// Immutable affine encoder/decoder pair.
#[derive(Debug, Clone)]
pub struct LatentModel {
    config: TransformConfig,
    encoder: DMatrix<f64>,
    encoder_bias: DVector<f64>,
    decoder: DMatrix<f64>,
    decoder_bias: DVector<f64>,
}

impl LatentModel {
    /// Builds the default spectral model: the full orthonormal DCT-II basis
    /// over the packed buffer, decoded by its transpose.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidConfig`] for a zero-sized or
    /// over-wide configuration.
    #[allow(clippy::cast_precision_loss)]
    pub fn spectral(config: TransformConfig) -> Result<Self, TransformError> {
        config.validate()?;
        let n = config.packed_dim();
        let nf = n as f64;
        let encoder = DMatrix::from_fn(config.latent_dim, n, |k, i| {
            let scale = if k == 0 { (1.0 / nf).sqrt() } else { (2.0 / nf).sqrt() };
            scale * (PI * (i as f64 + 0.5) * k as f64 / nf).cos()
        });
        let decoder = encoder.transpose();
        Ok(Self {
            config,
            encoder,
            encoder_bias: DVector::zeros(config.latent_dim),
            decoder,
            decoder_bias: DVector::zeros(n),
        })
    }

    /// Loads weights from a container file.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] if the file cannot be read or a weight
    /// has the wrong shape for `config`.
    pub fn load(path: &Path, config: TransformConfig) -> Result<Self, TransformError> {
        config.validate()?;
        let doc = NamedArrays::read(path)?;
        let (n, l) = (config.packed_dim(), config.latent_dim);
        let model = Self {
            config,
            encoder: matrix(&doc, ENCODER_WEIGHT, l, n)?,
            encoder_bias: vector(&doc, ENCODER_BIAS, l)?,
            decoder: matrix(&doc, DECODER_WEIGHT, n, l)?,
            decoder_bias: vector(&doc, DECODER_BIAS, n)?,
        };
        info!(
            path = %path.display(),
            latent_dim = l,
            max_total_len = config.max_total_len,
            "latent model loaded"
        );
        Ok(model)
    }

    /// Serializes the weights into a container document.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Container`] if a weight is not finite.
    pub fn to_container(&self) -> Result<NamedArrays, TransformError> {
        let mut doc = NamedArrays::new();
        for (name, m) in [(ENCODER_WEIGHT, &self.encoder), (DECODER_WEIGHT, &self.decoder)] {
            doc.insert(name, vec![m.nrows(), m.ncols()], row_major(m))?;
        }
        for (name, v) in [(ENCODER_BIAS, &self.encoder_bias), (DECODER_BIAS, &self.decoder_bias)] {
            doc.insert(name, vec![v.len()], v.as_slice().to_vec())?;
        }
        Ok(doc)
    }

    /// Writes the weights to `path` through `writer`.
    ///
    /// # Errors
    ///
    /// Returns a transform error for non-finite weights or a write error.
    pub fn save(&self, writer: &ArtifactWriter, path: &Path) -> error::Result<PathBuf> {
        let format = ContainerFormat::from_path(path).unwrap_or(ContainerFormat::Json);
        let bytes = self
            .to_container()?
            .encode(format)
            .map_err(TransformError::from)?;
        let path = writer.write_bytes(path, &bytes)?;
        info!(path = %path.display(), "latent model saved");
        Ok(path)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Maps a vector to its latent encoding.
    ///
    /// Padding is dropped, the meaningful records are packed and the result
    /// always has `latent_dim` values.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::SequenceTooLong`] if more than
    /// `max_total_len` meaningful records are present, or
    /// [`TransformError::LatentOverflow`] if their packed form does not fit
    /// in `latent_dim` values.
    pub fn encode_vector(
        &self,
        vector: &CadSequenceVector,
    ) -> Result<LatentVector, TransformError> {
        let records: Vec<&Record> = vector.meaningful().map(|(_, r)| r).collect();
        if records.len() > self.config.max_total_len {
            return Err(TransformError::SequenceTooLong {
                records: records.len(),
                max: self.config.max_total_len,
            });
        }
        let x = DVector::from_vec(self.pack(&records)?);
        let z = &self.encoder * x + &self.encoder_bias;
        debug!(records = vector.len(), latent = z.len(), "encoded vector");
        Ok(z)
    }

    /// Maps a latent vector back to `max_total_len` well-formed records.
    ///
    /// Commands snap to the nearest known discriminant, arguments the
    /// command uses snap to the quantization grid and unused arguments are
    /// set to the pad value.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::LatentWidth`] if `latent` has the wrong length.
    pub fn decode_vector(
        &self,
        latent: &LatentVector,
    ) -> Result<CadSequenceVector, TransformError> {
        if latent.len() != self.config.latent_dim {
            return Err(TransformError::LatentWidth {
                expected: self.config.latent_dim,
                actual: latent.len(),
            });
        }
        let x = &self.decoder * latent + &self.decoder_bias;
        Ok(self.unpack(x.as_slice()))
    }

    fn pack(&self, records: &[&Record]) -> Result<Vec<f64>, TransformError> {
        let mut packed = Vec::with_capacity(self.config.packed_dim());
        for record in records {
            let command = Command::from_value(record[COL_CMD]).unwrap_or(Command::Eos);
            packed.push(command.value());
            packed.extend(command.arguments().iter().map(|&col| record[col]));
        }
        if packed.len() > self.config.packed_dim() {
            return Err(TransformError::LatentOverflow {
                packed: packed.len(),
                capacity: self.config.packed_dim(),
            });
        }
        packed.resize(self.config.packed_dim(), Command::Eos.value());
        Ok(packed)
    }

    /// Walks the packed buffer and rebuilds exactly `max_total_len` records.
    ///
    /// Commands snap to the nearest discriminant. A command whose arguments
    /// run past the end of the buffer becomes EOS.
    fn unpack(&self, raw: &[f64]) -> CadSequenceVector {
        let q = self.config.quantization;
        let mut records = Vec::with_capacity(self.config.max_total_len);
        let mut cursor = 0;
        while records.len() < self.config.max_total_len && cursor < raw.len() {
            let command = snap_command(raw[cursor]);
            let args = command.arguments();
            let Some(values) = raw.get(cursor + 1..cursor + 1 + args.len()) else {
                break;
            };
            let mut record = command_record(command);
            for (&col, &value) in args.iter().zip(values) {
                record[col] = match discrete_range(col) {
                    Some(max) => snap_discrete(value, max),
                    None => q.snap(value),
                };
            }
            records.push(record);
            cursor += 1 + args.len();
        }
        records.resize(self.config.max_total_len, command_record(Command::Eos));
        CadSequenceVector::new(records)
    }
}

fn snap_command(value: f64) -> Command {
    let index = if value.is_finite() { value.round().clamp(0.0, 5.0) } else { 3.0 };
    Command::from_value(index).unwrap_or(Command::Eos)
}

/// Largest admissible value of a column holding a small enumeration.
fn discrete_range(col: usize) -> Option<f64> {
    match col {
        COL_FLAG => Some(1.0),
        COL_BOOLEAN => Some(3.0),
        COL_EXTENT_TYPE => Some(2.0),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn snap_discrete(value: f64, max: f64) -> f64 {
    match discrete(value.clamp(0.0, max).round()) {
        Some(v) => v as f64,
        None => 0.0,
    }
}

fn row_major(m: &DMatrix<f64>) -> Vec<f64> {
    m.transpose().as_slice().to_vec()
}

fn matrix(
    doc: &NamedArrays,
    name: &'static str,
    rows: usize,
    cols: usize,
) -> Result<DMatrix<f64>, TransformError> {
    let ds = doc.get(name)?;
    if ds.shape != [rows, cols] {
        return Err(TransformError::WeightShape {
            name,
            expected: vec![rows, cols],
            actual: ds.shape.clone(),
        });
    }
    Ok(DMatrix::from_row_slice(rows, cols, &ds.data))
}

fn vector(
    doc: &NamedArrays,
    name: &'static str,
    len: usize,
) -> Result<DVector<f64>, TransformError> {
    let ds = doc.get(name)?;
    if ds.shape != [len] {
        return Err(TransformError::WeightShape {
            name,
            expected: vec![len],
            actual: ds.shape.clone(),
        });
    }
    Ok(DVector::from_column_slice(&ds.data))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sequence::{pad_record, SequenceCodec, COL_X, COL_Y, PAD_VALUE};

    fn line(x: f64, y: f64) -> Record {
        let mut r = command_record(Command::Line);
        r[COL_X] = x;
        r[COL_Y] = y;
        r
    }

    fn ext() -> Record {
        let mut r = command_record(Command::Ext);
        for &col in Command::Ext.arguments() {
            r[col] = 128.0;
        }
        r[COL_BOOLEAN] = 0.0;
        r[COL_EXTENT_TYPE] = 0.0;
        r
    }

    fn triangle() -> CadSequenceVector {
        CadSequenceVector::new(vec![
            command_record(Command::Sol),
            line(200.0, 64.0),
            line(128.0, 200.0),
            line(64.0, 64.0),
            ext(),
        ])
    }

    fn lossless() -> TransformConfig {
        TransformConfig {
            max_total_len: 8,
            latent_dim: 8 * RECORD_WIDTH,
            quantization: Quantization::default(),
        }
    }

    // ── Spectral basis ──────────────────────────────────────────────

    #[test]
    fn spectral_rows_are_orthonormal() {
        let config = TransformConfig {
            max_total_len: 2,
            latent_dim: 10,
            quantization: Quantization::default(),
        };
        let model = LatentModel::spectral(config).unwrap();
        let gram = &model.encoder * model.encoder.transpose();
        let identity = DMatrix::<f64>::identity(10, 10);
        assert!((gram - identity).abs().max() < 1e-12);
    }

    #[test]
    fn oversized_latent_is_rejected() {
        let config = TransformConfig {
            max_total_len: 1,
            latent_dim: RECORD_WIDTH + 1,
            quantization: Quantization::default(),
        };
        assert!(matches!(
            LatentModel::spectral(config),
            Err(TransformError::InvalidConfig(_))
        ));
    }

    // ── Encode / decode ─────────────────────────────────────────────

    #[test]
    fn default_model_restores_records() {
        let model = LatentModel::spectral(TransformConfig::default()).unwrap();
        let z = model.encode_vector(&triangle()).unwrap();
        let decoded = model.decode_vector(&z).unwrap();
        assert_eq!(decoded.len(), 60);
        assert_eq!(decoded.records()[..5], triangle().records()[..]);
        for record in &decoded.records()[5..] {
            assert_eq!(*record, command_record(Command::Eos));
        }
        let codec = SequenceCodec::new(Quantization::default());
        assert_eq!(
            codec.to_sequence(&decoded).unwrap(),
            codec.to_sequence(&triangle()).unwrap()
        );
    }

    #[test]
    fn packed_overflow_is_rejected() {
        let config = TransformConfig {
            max_total_len: 8,
            latent_dim: 20,
            quantization: Quantization::default(),
        };
        let model = LatentModel::spectral(config).unwrap();
        let err = model.encode_vector(&triangle()).unwrap_err();
        assert!(matches!(
            err,
            TransformError::LatentOverflow { packed: 22, capacity: 20 }
        ));
    }

    #[test]
    fn truncated_command_decodes_as_eos() {
        let config = TransformConfig {
            max_total_len: 4,
            latent_dim: 4,
            quantization: Quantization::default(),
        };
        let model = LatentModel::spectral(config).unwrap();
        // SOL, then an Ext whose arguments do not fit.
        let z = &model.encoder * DVector::from_vec(vec![4.0, 5.0, 1.0, 1.0]);
        let decoded = model.decode_vector(&z).unwrap();
        assert_eq!(decoded.records()[0], command_record(Command::Sol));
        for record in &decoded.records()[1..] {
            assert_eq!(*record, command_record(Command::Eos));
        }
    }

    #[test]
    fn encoding_has_latent_width() {
        let model = LatentModel::spectral(TransformConfig::default()).unwrap();
        let z = model.encode_vector(&triangle()).unwrap();
        assert_eq!(z.len(), 256);
    }

    #[test]
    fn full_width_model_restores_records() {
        let model = LatentModel::spectral(lossless()).unwrap();
        let z = model.encode_vector(&triangle()).unwrap();
        let decoded = model.decode_vector(&z).unwrap();
        assert_eq!(decoded.len(), 8);
        assert_eq!(decoded.records()[..5], triangle().records()[..]);
        assert_eq!(decoded.records()[5], command_record(Command::Eos));
    }

    #[test]
    fn padding_is_ignored_when_encoding() {
        let model = LatentModel::spectral(lossless()).unwrap();
        let mut records = vec![pad_record(), pad_record()];
        records.extend_from_slice(triangle().records());
        let padded = CadSequenceVector::new(records);
        assert_eq!(
            model.encode_vector(&padded).unwrap(),
            model.encode_vector(&triangle()).unwrap()
        );
    }

    #[test]
    fn too_many_records_are_rejected() {
        let model = LatentModel::spectral(lossless()).unwrap();
        let long = CadSequenceVector::new(vec![line(1.0, 1.0); 9]);
        let err = model.encode_vector(&long).unwrap_err();
        assert!(matches!(err, TransformError::SequenceTooLong { records: 9, max: 8 }));
    }

    #[test]
    fn wrong_latent_width_is_rejected() {
        let model = LatentModel::spectral(TransformConfig::default()).unwrap();
        let err = model.decode_vector(&DVector::zeros(12)).unwrap_err();
        assert!(matches!(
            err,
            TransformError::LatentWidth { expected: 256, actual: 12 }
        ));
    }

    #[test]
    fn decoded_records_are_well_formed() {
        let model = LatentModel::spectral(TransformConfig::default()).unwrap();
        let z = DVector::from_fn(256, |i, _| ((i * 37) % 11) as f64 - 5.0);
        let decoded = model.decode_vector(&z).unwrap();
        assert_eq!(decoded.len(), 60);
        for record in decoded.records() {
            let command = Command::from_value(record[COL_CMD]).unwrap();
            for col in 1..RECORD_WIDTH {
                let value = record[col];
                if command.arguments().contains(&col) {
                    assert!((0.0..=255.0).contains(&value));
                    assert_eq!(value, value.round());
                } else {
                    assert_eq!(value, PAD_VALUE);
                }
            }
        }
    }

    // ── Persistence ─────────────────────────────────────────────────

    #[test]
    fn weights_survive_a_container_round_trip() {
        let config = TransformConfig {
            max_total_len: 3,
            latent_dim: 7,
            quantization: Quantization::default(),
        };
        let model = LatentModel::spectral(config).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights").join("model.json");
        model.save(&ArtifactWriter::new(), &path).unwrap();

        let loaded = LatentModel::load(&path, config).unwrap();
        assert!((&loaded.encoder - &model.encoder).abs().max() < 1e-12);
        assert!((&loaded.decoder - &model.decoder).abs().max() < 1e-12);

        let mismatched = TransformConfig { latent_dim: 6, ..config };
        let err = LatentModel::load(&path, mismatched).unwrap_err();
        assert!(matches!(
            err,
            TransformError::WeightShape { name: "encoder_weight", .. }
        ));
    }
}
