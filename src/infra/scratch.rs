use std::{
    io,
    path::{Path, PathBuf},
};

use tempfile::TempDir;
use tracing::{debug, warn};

const SCRATCH_PREFIX: &str = "epubmath-";

/// Uniquely named working directory holding one extracted container.
///
/// The directory is removed by [`ScratchArea::close`]; if the value is
/// dropped without closing (early return, unwinding) the drop guard removes
/// it instead.
#[derive(Debug)]
pub struct ScratchArea {
    dir: TempDir,
    root: PathBuf,
}

impl ScratchArea {
    /// Create a fresh scratch directory under `parent`, or under the system
    /// temporary directory when no parent is configured.
    pub fn create(parent: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        let root = dir.path().canonicalize()?;
        debug!(
            target = "infra::scratch",
            root = %root.display(),
            "Created scratch area"
        );
        Ok(Self { dir, root })
    }

    /// Absolute, canonical path of the extraction root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove the directory tree, logging rather than failing on error so
    /// cleanup never masks the pipeline's own outcome.
    pub fn close(self) {
        let root = self.root;
        match self.dir.close() {
            Ok(()) => debug!(
                target = "infra::scratch",
                root = %root.display(),
                "Removed scratch area"
            ),
            Err(err) => warn!(
                target = "infra::scratch",
                root = %root.display(),
                error = %err,
                "Failed to remove scratch area"
            ),
        }
    }
}
