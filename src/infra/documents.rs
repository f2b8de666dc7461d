use std::path::{Path, PathBuf};

use walkdir::WalkDir;

const DOCUMENT_EXTENSIONS: [&str; 3] = ["xhtml", "html", "htm"];

/// Whether `path` names a markup document eligible for math conversion.
pub fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            DOCUMENT_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

/// All documents under `root`, sorted by path.
pub fn discover_documents(root: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_document(entry.path()) {
            documents.push(entry.into_path());
        }
    }
    documents.sort();
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn recognises_markup_extensions_case_insensitively() {
        assert!(is_document(Path::new("a/ch1.xhtml")));
        assert!(is_document(Path::new("a/CH1.HTML")));
        assert!(is_document(Path::new("index.htm")));
        assert!(!is_document(Path::new("content.opf")));
        assert!(!is_document(Path::new("style.css")));
        assert!(!is_document(Path::new("xhtml")));
    }

    #[test]
    fn discovers_sorted_documents_only() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        fs::create_dir_all(root.join("OEBPS/text")).expect("mkdir");
        fs::write(root.join("OEBPS/text/b.xhtml"), "b").expect("write");
        fs::write(root.join("OEBPS/text/a.xhtml"), "a").expect("write");
        fs::write(root.join("OEBPS/nav.html"), "nav").expect("write");
        fs::write(root.join("OEBPS/content.opf"), "opf").expect("write");
        fs::write(root.join("mimetype"), "application/epub+zip").expect("write");

        let found = discover_documents(root).expect("walk");
        let relative: Vec<_> = found
            .iter()
            .map(|path| path.strip_prefix(root).expect("prefix").to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("OEBPS/nav.html"),
                PathBuf::from("OEBPS/text/a.xhtml"),
                PathBuf::from("OEBPS/text/b.xhtml"),
            ]
        );
    }
}
