//! HDF5 encoding of [`NamedArrays`]: one `f64` dataset per name at the root
//! group. The library works on paths, so bytes pass through a scratch file.

use std::path::Path;

use super::{Dataset, NamedArrays};
use crate::error::ContainerError;

const SCRATCH_NAME: &str = "container.h5";

pub(super) fn read(bytes: &[u8]) -> Result<NamedArrays, ContainerError> {
    let dir = scratch_dir()?;
    let path = dir.path().join(SCRATCH_NAME);
    std::fs::write(&path, bytes).map_err(|source| io_error(&path, source))?;

    let file = hdf5::File::open(&path).map_err(hdf5_error)?;
    let mut doc = NamedArrays::new();
    for ds in file.datasets().map_err(hdf5_error)? {
        let name = ds.name().trim_start_matches('/').to_string();
        let shape = ds.shape();
        let data = ds.read_raw::<f64>().map_err(hdf5_error)?;
        doc.datasets.insert(name, Dataset { shape, data });
    }
    Ok(doc)
}

pub(super) fn write(doc: &NamedArrays) -> Result<Vec<u8>, ContainerError> {
    let dir = scratch_dir()?;
    let path = dir.path().join(SCRATCH_NAME);
    {
        let file = hdf5::File::create(&path).map_err(hdf5_error)?;
        for (name, ds) in &doc.datasets {
            file.new_dataset::<f64>()
                .shape(ds.shape.clone())
                .create(name.as_str())
                .and_then(|d| d.write_raw(ds.data.as_slice()))
                .map_err(hdf5_error)?;
        }
        file.close().map_err(hdf5_error)?;
    }
    std::fs::read(&path).map_err(|source| io_error(&path, source))
}

fn scratch_dir() -> Result<tempfile::TempDir, ContainerError> {
    tempfile::tempdir().map_err(|source| io_error(&std::env::temp_dir(), source))
}

#[allow(clippy::needless_pass_by_value)]
fn hdf5_error(error: hdf5::Error) -> ContainerError {
    ContainerError::Hdf5(error.to_string())
}

fn io_error(path: &Path, source: std::io::Error) -> ContainerError {
    ContainerError::Io {
        path: path.to_path_buf(),
        source,
    }
}
