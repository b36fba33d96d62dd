//! Named-array containers.
//!
//! JSON documents look like
//! `{"datasets": {"out_vec": {"shape": [n, 17], "data": [...]}}}`. HDF5
//! files hold the same datasets at the root group. Data is flat and
//! row-major in memory.

#[cfg(feature = "hdf5")]
mod hdf5;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ContainerError;

/// Dataset holding a CAD sequence vector.
pub const VECTOR_DATASET: &str = "out_vec";

/// Legacy dataset name accepted when [`VECTOR_DATASET`] is absent.
pub const VECTOR_DATASET_FALLBACK: &str = "vec";

/// Dataset holding a latent vector.
pub const LATENT_DATASET: &str = "zs";

/// On-disk encoding of a [`NamedArrays`] document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "h5")]
    Hdf5,
}

impl ContainerFormat {
    pub const ALL: [Self; 2] = [Self::Json, Self::Hdf5];

    /// Parses a request's `file_format` tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.tag() == tag)
    }

    /// Picks the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Hdf5 => "h5",
        }
    }

    /// File extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        self.tag()
    }

    /// Whether this build can read and write the format.
    #[must_use]
    pub fn is_available(self) -> bool {
        match self {
            Self::Json => true,
            Self::Hdf5 => cfg!(feature = "hdf5"),
        }
    }
}

/// One named n-dimensional array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

/// A document of named arrays.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NamedArrays {
    datasets: BTreeMap<String, Dataset>,
}

impl NamedArrays {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a document and checks every dataset's shape.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Parse`] for invalid JSON and
    /// [`ContainerError::ShapeMismatch`] when a shape disagrees with its data.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ContainerError> {
        let doc: Self = serde_json::from_slice(bytes)?;
        for (name, ds) in &doc.datasets {
            check_shape(name, &ds.shape, ds.data.len())?;
        }
        Ok(doc)
    }

    /// Parses a document in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::UnsupportedFormat`] if this build cannot
    /// read `format`, otherwise as the format's reader.
    pub fn decode(format: ContainerFormat, bytes: &[u8]) -> Result<Self, ContainerError> {
        match format {
            ContainerFormat::Json => Self::from_slice(bytes),
            #[cfg(feature = "hdf5")]
            ContainerFormat::Hdf5 => {
                let doc = hdf5::read(bytes)?;
                for (name, ds) in &doc.datasets {
                    check_shape(name, &ds.shape, ds.data.len())?;
                }
                Ok(doc)
            }
            #[cfg(not(feature = "hdf5"))]
            ContainerFormat::Hdf5 => Err(ContainerError::UnsupportedFormat(format.tag())),
        }
    }

    /// Serializes the document in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::UnsupportedFormat`] if this build cannot
    /// write `format`, otherwise as the format's writer.
    pub fn encode(&self, format: ContainerFormat) -> Result<Vec<u8>, ContainerError> {
        match format {
            ContainerFormat::Json => self.to_vec(),
            #[cfg(feature = "hdf5")]
            ContainerFormat::Hdf5 => hdf5::write(self),
            #[cfg(not(feature = "hdf5"))]
            ContainerFormat::Hdf5 => Err(ContainerError::UnsupportedFormat(format.tag())),
        }
    }

    /// Reads a document from disk. The extension picks the format; anything
    /// other than `.h5` is read as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Io`] if the file cannot be read, otherwise as
    /// [`NamedArrays::decode`].
    pub fn read(path: &Path) -> Result<Self, ContainerError> {
        let bytes = std::fs::read(path).map_err(|source| ContainerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let format = ContainerFormat::from_path(path).unwrap_or(ContainerFormat::Json);
        Self::decode(format, &bytes)
    }

    /// Serializes the document.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Parse`] if serialization fails.
    pub fn to_vec(&self) -> Result<Vec<u8>, ContainerError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Adds or replaces a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ShapeMismatch`] or
    /// [`ContainerError::NonFinite`]; JSON cannot carry NaN or infinity.
    pub fn insert(
        &mut self,
        name: &str,
        shape: Vec<usize>,
        data: Vec<f64>,
    ) -> Result<(), ContainerError> {
        check_shape(name, &shape, data.len())?;
        if let Some(index) = data.iter().position(|v| !v.is_finite()) {
            return Err(ContainerError::NonFinite {
                name: name.to_string(),
                index,
            });
        }
        self.datasets.insert(name.to_string(), Dataset { shape, data });
        Ok(())
    }

    /// Looks up a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::MissingDataset`] if absent.
    pub fn get(&self, name: &str) -> Result<&Dataset, ContainerError> {
        self.datasets
            .get(name)
            .ok_or_else(|| ContainerError::MissingDataset(name.to_string()))
    }

    /// Looks up the first present dataset among `names`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::MissingDataset`] naming the first candidate.
    pub fn get_any(&self, names: &[&str]) -> Result<&Dataset, ContainerError> {
        names.iter().find_map(|n| self.datasets.get(*n)).ok_or_else(|| {
            ContainerError::MissingDataset(names.first().copied().unwrap_or_default().to_string())
        })
    }

    /// Names of the stored datasets in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }
}

fn check_shape(name: &str, shape: &[usize], len: usize) -> Result<(), ContainerError> {
    if shape.iter().try_fold(1_usize, |acc, &d| acc.checked_mul(d)) == Some(len) {
        Ok(())
    } else {
        Err(ContainerError::ShapeMismatch {
            name: name.to_string(),
            shape: shape.to_vec(),
            len,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_lookup() {
        let doc = NamedArrays::from_slice(
            br#"{"datasets": {"vec": {"shape": [1, 2], "data": [1.0, 2.0]}}}"#,
        )
        .unwrap();
        let ds = doc.get_any(&[VECTOR_DATASET, VECTOR_DATASET_FALLBACK]).unwrap();
        assert_eq!(ds.data, vec![1.0, 2.0]);
        assert!(matches!(
            doc.get(LATENT_DATASET),
            Err(ContainerError::MissingDataset(name)) if name == "zs"
        ));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let err = NamedArrays::from_slice(
            br#"{"datasets": {"zs": {"shape": [3], "data": [1.0]}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ContainerError::ShapeMismatch { len: 1, .. }));
    }

    #[test]
    fn overflowing_shape_is_a_mismatch() {
        let err = NamedArrays::from_slice(
            br#"{"datasets": {"out_vec": {"shape": [4294967296, 4294967296, 17], "data": [1.0]}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ContainerError::ShapeMismatch { len: 1, .. }));

        let mut doc = NamedArrays::new();
        let err = doc
            .insert("zs", vec![usize::MAX, 2], vec![0.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, ContainerError::ShapeMismatch { len: 2, .. }));
    }

    #[test]
    fn formats_follow_tags_and_extensions() {
        assert_eq!(ContainerFormat::from_tag("h5"), Some(ContainerFormat::Hdf5));
        assert_eq!(ContainerFormat::from_tag("json"), Some(ContainerFormat::Json));
        assert_eq!(ContainerFormat::from_tag("hdf5"), None);
        assert_eq!(
            ContainerFormat::from_path(Path::new("a/part_zs.h5")),
            Some(ContainerFormat::Hdf5)
        );
        assert_eq!(ContainerFormat::from_path(Path::new("part")), None);
        assert!(ContainerFormat::Json.is_available());
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn hdf5_needs_the_feature() {
        assert!(matches!(
            NamedArrays::decode(ContainerFormat::Hdf5, b"\x89HDF"),
            Err(ContainerError::UnsupportedFormat("h5"))
        ));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            NamedArrays::from_slice(b"not json"),
            Err(ContainerError::Parse(_))
        ));
    }

    #[test]
    fn insert_rejects_non_finite() {
        let mut doc = NamedArrays::new();
        let err = doc.insert("zs", vec![2], vec![0.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, ContainerError::NonFinite { index: 1, .. }));
        doc.insert("zs", vec![2], vec![0.0, 1.0]).unwrap();
        let back = NamedArrays::from_slice(&doc.to_vec().unwrap()).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.names().collect::<Vec<_>>(), vec!["zs"]);
    }
}
