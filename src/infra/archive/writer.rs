use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

use tracing::debug;
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use super::{ArchiveError, ExtractionCause, MARKER_ENTRY};

/// Counts of what repacking wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub entries: usize,
    pub bytes: u64,
}

/// Pack every file beneath `root` into a new container at `output`.
///
/// The marker entry is written first and stored; the remaining files follow
/// sorted by archive-relative path and deflated. Empty directories are kept
/// as `name/` entries in the same order. Any file already at
/// `output` is removed before writing. Returns once the archive has been
/// finished, flushed and synced.
pub fn write_container(root: &Path, output: &Path) -> Result<WriteStats, ArchiveError> {
    let marker = root.join(MARKER_ENTRY);
    if !marker.is_file() {
        return Err(ArchiveError::MissingMarker {
            root: root.to_path_buf(),
        });
    }

    let write_error = |source: ExtractionCause| ArchiveError::Write {
        path: output.to_path_buf(),
        source,
    };

    let entries = collect_entries(root).map_err(write_error)?;

    match fs::remove_file(output) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(write_error(err.into())),
    }

    let file = File::create(output).map_err(|err| write_error(err.into()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    append_file(&mut zip, MARKER_ENTRY, &marker, stored).map_err(write_error)?;
    for entry in &entries {
        match entry {
            Entry::File { name, path } => {
                append_file(&mut zip, name, path, deflated).map_err(write_error)?
            }
            Entry::Directory { name } => zip
                .add_directory(name.as_str(), deflated)
                .map_err(|err| write_error(err.into()))?,
        }
    }

    let buffered = zip.finish().map_err(|err| write_error(err.into()))?;
    let file = buffered
        .into_inner()
        .map_err(|err| write_error(err.into_error().into()))?;
    file.sync_all().map_err(|err| write_error(err.into()))?;
    let bytes = file.metadata().map_err(|err| write_error(err.into()))?.len();

    Ok(WriteStats {
        entries: entries.len() + 1,
        bytes,
    })
}

enum Entry {
    File { name: String, path: PathBuf },
    Directory { name: String },
}

impl Entry {
    fn name(&self) -> &str {
        match self {
            Entry::File { name, .. } | Entry::Directory { name } => name,
        }
    }
}

/// Files under `root` except the marker, plus directories with nothing in
/// them, sorted by their `/`-separated archive name.
fn collect_entries(root: &Path) -> Result<Vec<Entry>, ExtractionCause> {
    let mut entries = Vec::new();
    for item in WalkDir::new(root).min_depth(1) {
        let item = item?;
        let relative = item
            .path()
            .strip_prefix(root)
            .map_err(|err| io::Error::other(err.to_string()))?;
        let name = archive_name(relative);

        if item.file_type().is_dir() {
            if fs::read_dir(item.path())?.next().is_none() {
                entries.push(Entry::Directory {
                    name: format!("{name}/"),
                });
            }
            continue;
        }
        if !item.file_type().is_file() || name == MARKER_ENTRY {
            continue;
        }
        entries.push(Entry::File {
            name,
            path: item.into_path(),
        });
    }
    entries.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(entries)
}

fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn append_file<W: Write + io::Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    path: &Path,
    options: SimpleFileOptions,
) -> Result<(), ExtractionCause> {
    zip.start_file(name, options)?;
    let mut reader = BufReader::new(File::open(path)?);
    let written = io::copy(&mut reader, zip)?;
    debug!(
        target = "infra::archive::writer",
        entry = name,
        bytes = written,
        "Packed entry"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use tempfile::TempDir;
    use zip::ZipArchive;

    use super::*;

    fn write(root: &Path, name: &str, content: &[u8]) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write");
    }

    #[test]
    fn marker_first_and_stored_then_sorted_deflated() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path().join("book");
        write(&root, "OEBPS/z.xhtml", b"<html/>");
        write(&root, "META-INF/container.xml", b"<container/>");
        write(&root, "mimetype", b"application/epub+zip");
        write(&root, "OEBPS/a.css", b"body{}");

        let output = dir.path().join("out.epub");
        let stats = write_container(&root, &output).expect("write");
        assert_eq!(stats.entries, 4);

        let mut archive = ZipArchive::new(File::open(&output).expect("open")).expect("zip");
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).expect("entry").name().to_string())
            .collect();
        assert_eq!(
            names,
            [
                "mimetype",
                "META-INF/container.xml",
                "OEBPS/a.css",
                "OEBPS/z.xhtml"
            ]
        );

        let mut marker = archive.by_index(0).expect("marker");
        assert_eq!(marker.compression(), CompressionMethod::Stored);
        let mut content = String::new();
        marker.read_to_string(&mut content).expect("read");
        assert_eq!(content, "application/epub+zip");
        drop(marker);

        for index in 1..archive.len() {
            let entry = archive.by_index(index).expect("entry");
            assert_eq!(entry.compression(), CompressionMethod::Deflated);
        }
    }

    #[test]
    fn empty_directories_become_directory_entries() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path().join("book");
        write(&root, "mimetype", b"application/epub+zip");
        write(&root, "OEBPS/text/a.xhtml", b"<html/>");
        fs::create_dir_all(root.join("OEBPS/fonts")).expect("mkdir");

        let output = dir.path().join("out.epub");
        let stats = write_container(&root, &output).expect("write");
        assert_eq!(stats.entries, 3);

        let mut archive = ZipArchive::new(File::open(&output).expect("open")).expect("zip");
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).expect("entry").name().to_string())
            .collect();
        assert_eq!(names, ["mimetype", "OEBPS/fonts/", "OEBPS/text/a.xhtml"]);
        assert!(archive.by_name("OEBPS/fonts/").expect("directory").is_dir());
    }

    #[test]
    fn missing_marker_is_rejected_before_touching_output() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path().join("book");
        write(&root, "OEBPS/a.xhtml", b"<html/>");
        let output = dir.path().join("out.epub");
        fs::write(&output, b"previous").expect("seed output");

        let err = write_container(&root, &output).expect_err("must fail");
        assert!(matches!(err, ArchiveError::MissingMarker { .. }));
        assert_eq!(fs::read(&output).expect("read"), b"previous");
    }

    #[test]
    fn existing_output_is_replaced() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path().join("book");
        write(&root, "mimetype", b"application/epub+zip");
        let output = dir.path().join("out.epub");
        fs::write(&output, b"stale bytes that are not a zip").expect("seed output");

        write_container(&root, &output).expect("write");
        let archive = ZipArchive::new(File::open(&output).expect("open")).expect("zip");
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn output_is_reproducible() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path().join("book");
        write(&root, "mimetype", b"application/epub+zip");
        write(&root, "OEBPS/b.xhtml", b"<p>b</p>");
        write(&root, "OEBPS/a.xhtml", b"<p>a</p>");

        let first = dir.path().join("first.epub");
        let second = dir.path().join("second.epub");
        write_container(&root, &first).expect("first");
        write_container(&root, &second).expect("second");

        assert_eq!(
            fs::read(first).expect("read"),
            fs::read(second).expect("read")
        );
    }
}
