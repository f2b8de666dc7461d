use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter},
    path::Path,
};

use tracing::debug;
use zip::ZipArchive;

use super::{ArchiveError, ExtractionCause, sandbox::resolve_entry_path};

/// Counts of what extraction materialised on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Extract every entry of the container at `input` beneath `root`.
///
/// Entries are processed in the container's internal order and streamed to
/// disk. The first unsafe name or I/O fault aborts extraction; whatever was
/// already written stays in place for the caller's scratch cleanup.
pub fn extract_container(input: &Path, root: &Path) -> Result<ExtractStats, ArchiveError> {
    let open_error = |source: ExtractionCause| ArchiveError::Open {
        path: input.to_path_buf(),
        source,
    };

    let file = File::open(input).map_err(|err| open_error(err.into()))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|err| open_error(err.into()))?;

    let mut stats = ExtractStats::default();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|err| ArchiveError::Extraction {
            entry: format!("#{index}"),
            source: err.into(),
        })?;
        let name = entry.name().to_string();
        let extraction_error = |source: ExtractionCause| ArchiveError::Extraction {
            entry: name.clone(),
            source,
        };

        let destination =
            resolve_entry_path(root, &name).map_err(|err| extraction_error(err.into()))?;

        if name.replace('\\', "/").ends_with('/') {
            fs::create_dir_all(&destination).map_err(|err| extraction_error(err.into()))?;
            stats.directories += 1;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|err| extraction_error(err.into()))?;
        }

        let mut writer = BufWriter::new(
            File::create(&destination).map_err(|err| extraction_error(err.into()))?,
        );
        let written =
            io::copy(&mut entry, &mut writer).map_err(|err| extraction_error(err.into()))?;
        writer
            .into_inner()
            .map_err(|err| extraction_error(err.into_error().into()))?;

        debug!(
            target = "infra::archive::reader",
            entry = %name,
            bytes = written,
            "Extracted entry"
        );
        stats.files += 1;
        stats.bytes += written;
    }

    Ok(stats)
}
