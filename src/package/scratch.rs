// src/package/scratch.rs
//! Operation-local scratch areas
//!
//! A scratch area is a temporary directory owned by exactly one operation.
//! It is removed when the [`Scratch`] value is dropped, so every exit path
//! of the owning operation, including `?` returns, releases it.

use crate::error::{Error, Result};
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, warn};

const SCRATCH_PREFIX: &str = "vnfpack-";

#[derive(Debug)]
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    /// Create a scratch directory under `root`, which must already exist
    pub fn create(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::MissingPath {
                what: "scratch directory",
                path: root.to_path_buf(),
            });
        }
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)
            .map_err(|e| Error::io(root, e))?;
        debug!("Created scratch area {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the scratch area, reporting failures instead of ignoring them
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| Error::io(&path, e))?;
        debug!("Removed scratch area {}", path.display());
        Ok(())
    }
}

/// Remove files, logging failures without aborting
pub(crate) fn remove_files<'a, I>(paths: I)
where
    I: IntoIterator<Item = &'a Path>,
{
    for path in paths {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}
