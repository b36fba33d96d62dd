//! Storage areas and deterministic artifact names.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::container::ContainerFormat;
use crate::error::WriteError;

/// A directory under the storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Uploaded,
    Stl,
    Latent,
    Decoded,
}

impl Area {
    pub const ALL: [Self; 4] = [Self::Uploaded, Self::Stl, Self::Latent, Self::Decoded];

    /// Areas whose files may be downloaded.
    pub const OUTPUTS: [Self; 3] = [Self::Stl, Self::Latent, Self::Decoded];

    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded_files",
            Self::Stl => "stl_files",
            Self::Latent => "zs_files",
            Self::Decoded => "dec_files",
        }
    }
}

/// What an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Mesh,
    Latent,
    DecodedVector,
}

/// A file published by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// File name, unique within its area.
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
}

/// The storage root and its areas.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates every area directory.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::CreateDir`] naming the directory that failed.
    pub fn ensure(&self) -> Result<(), WriteError> {
        for area in Area::ALL {
            let dir = self.dir(area);
            std::fs::create_dir_all(&dir)
                .map_err(|source| WriteError::CreateDir { path: dir, source })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn dir(&self, area: Area) -> PathBuf {
        self.root.join(area.dir_name())
    }

    #[must_use]
    pub fn path(&self, area: Area, name: &str) -> PathBuf {
        self.dir(area).join(name)
    }

    /// Finds a downloadable artifact by file name. Names containing path
    /// components are never resolved.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let name = plain_file_name(name)?;
        Area::OUTPUTS
            .iter()
            .map(|&area| self.path(area, name))
            .find(|p| p.is_file())
    }
}

/// Returns `name` if it is a single normal path component.
#[must_use]
pub fn plain_file_name(name: &str) -> Option<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(c)), None) if c.to_str() == Some(name) => Some(name),
        _ => None,
    }
}

/// File stem of an uploaded name: the base name without its extension.
#[must_use]
pub fn stem(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(i) if i > 0 => &base[..i],
        _ => base,
    }
}

#[must_use]
pub fn mesh_name(stem: &str) -> String {
    format!("{stem}.stl")
}

#[must_use]
pub fn latent_name(stem: &str, format: ContainerFormat) -> String {
    format!("{stem}_zs.{}", format.extension())
}

/// Name of a decoded vector; a trailing `_zs` on the stem is dropped.
#[must_use]
pub fn decoded_name(stem: &str, format: ContainerFormat) -> String {
    let base = stem.strip_suffix("_zs").unwrap_or(stem);
    format!("{base}_dec.{}", format.extension())
}

#[must_use]
pub fn decoded_mesh_name(stem: &str) -> String {
    format!("{stem}_dec.stl")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_the_stem() {
        assert_eq!(stem("part.json"), "part");
        assert_eq!(stem("dir/part_zs.json"), "part_zs");
        assert_eq!(stem(".hidden"), ".hidden");
        assert_eq!(mesh_name("part"), "part.stl");
        assert_eq!(latent_name("part", ContainerFormat::Json), "part_zs.json");
        assert_eq!(latent_name("part", ContainerFormat::Hdf5), "part_zs.h5");
        assert_eq!(decoded_name("part_zs", ContainerFormat::Json), "part_dec.json");
        assert_eq!(decoded_name("part_zs", ContainerFormat::Hdf5), "part_dec.h5");
        assert_eq!(decoded_name("part", ContainerFormat::Json), "part_dec.json");
        assert_eq!(decoded_mesh_name("part"), "part_dec.stl");
    }

    #[test]
    fn find_ignores_traversal_and_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());
        storage.ensure().unwrap();
        std::fs::write(storage.path(Area::Stl, "part.stl"), b"solid").unwrap();
        std::fs::write(storage.path(Area::Uploaded, "part.json"), b"{}").unwrap();

        assert_eq!(storage.find("part.stl"), Some(storage.path(Area::Stl, "part.stl")));
        assert_eq!(storage.find("part.json"), None);
        assert_eq!(storage.find("../stl_files/part.stl"), None);
        assert_eq!(storage.find("stl_files/part.stl"), None);
        assert_eq!(storage.find(".."), None);
        assert_eq!(storage.find(""), None);
    }
}
