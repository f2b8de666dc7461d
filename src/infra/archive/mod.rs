//! EPUB container extraction and repacking.
//!
//! An EPUB container is a zip archive whose first entry must be an
//! uncompressed `mimetype` file. Extraction materialises every entry under a
//! scratch root, refusing names that would resolve outside it. Repacking
//! writes the marker first and every other file in sorted order so the
//! output is byte-for-byte reproducible.

mod reader;
mod sandbox;
mod writer;

use std::{io, path::PathBuf};

use thiserror::Error;

pub use reader::{ExtractStats, extract_container};
pub use sandbox::{UnsafePathError, resolve_entry_path};
pub use writer::{WriteStats, write_container};

/// Name of the root entry that identifies the container type.
pub const MARKER_ENTRY: &str = "mimetype";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to open container {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: ExtractionCause,
    },
    #[error("failed to extract entry `{entry}`: {source}")]
    Extraction {
        entry: String,
        #[source]
        source: ExtractionCause,
    },
    #[error("required `{MARKER_ENTRY}` entry missing under {root}")]
    MissingMarker { root: PathBuf },
    #[error("failed to write container {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: ExtractionCause,
    },
}

/// Underlying fault for an archive operation.
#[derive(Debug, Error)]
pub enum ExtractionCause {
    #[error(transparent)]
    UnsafePath(#[from] UnsafePathError),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl ArchiveError {
    /// True when extraction stopped because an entry tried to leave the root.
    pub fn is_unsafe_path(&self) -> bool {
        matches!(
            self,
            ArchiveError::Extraction {
                source: ExtractionCause::UnsafePath(_),
                ..
            }
        )
    }
}
