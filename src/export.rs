//! Atomic artifact publication and STL serialization.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::WriteError;
use crate::math::Point3;
use crate::tessellation::TriangleMesh;

/// Publishes artifacts by writing a sibling temporary file and renaming it
/// into place. Writers to the same destination are serialized.
#[derive(Debug, Default)]
pub struct ArtifactWriter {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ArtifactWriter {
    /// Creates a writer with no outstanding locks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `mesh` as binary STL to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::EmptyMesh`] for a mesh without triangles, or an
    /// I/O variant if any step fails. Nothing is left at `path` on failure.
    pub fn export_stl(&self, mesh: &TriangleMesh, path: &Path) -> Result<PathBuf, WriteError> {
        if mesh.is_empty() {
            return Err(WriteError::EmptyMesh(path.to_path_buf()));
        }
        let triangles = stl_triangles(mesh);
        self.publish(path, |file| {
            let mut out = BufWriter::new(file);
            stl_io::write_stl(&mut out, triangles.iter())?;
            out.flush()
        })?;
        debug!(path = %path.display(), triangles = triangles.len(), "wrote STL");
        Ok(path.to_path_buf())
    }

    /// Writes raw bytes to `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O [`WriteError`] if any step fails.
    pub fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<PathBuf, WriteError> {
        self.publish(path, |file| file.write_all(bytes))?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
        Ok(path.to_path_buf())
    }

    fn publish(
        &self,
        path: &Path,
        write: impl FnOnce(&mut File) -> std::io::Result<()>,
    ) -> Result<(), WriteError> {
        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|source| WriteError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let lock = self.lock_for(path);
        let result = {
            let _guard = lock.lock();
            Self::replace(&dir, path, write)
        };
        self.release(path, &lock);
        result
    }

    fn replace(
        dir: &Path,
        path: &Path,
        write: impl FnOnce(&mut File) -> std::io::Result<()>,
    ) -> Result<(), WriteError> {
        let mut tmp = NamedTempFile::new_in(dir).map_err(|source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        write(tmp.as_file_mut())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|source| WriteError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        tmp.persist(path).map_err(|e| WriteError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }

    /// Drops the entry for `path` once no other writer holds it.
    fn release(&self, path: &Path, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        // Handles are only cloned under the map lock; two means the map and us.
        if Arc::strong_count(lock) == 2 {
            locks.remove(path);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn stl_triangles(mesh: &TriangleMesh) -> Vec<stl_io::Triangle> {
    mesh.triangles()
        .map(|[a, b, c]| {
            let n = (b - a).cross(&(c - a));
            let len = n.norm();
            let normal = if len > 0.0 { n / len } else { n };
            let v = |p: Point3| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32]);
            stl_io::Triangle {
                normal: stl_io::Normal::new([normal.x as f32, normal.y as f32, normal.z as f32]),
                vertices: [v(a), v(b), v(c)],
            }
        })
        .collect()
}
