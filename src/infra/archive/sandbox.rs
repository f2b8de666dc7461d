use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("archive entry `{entry}` resolves outside the extraction root")]
pub struct UnsafePathError {
    pub entry: String,
}

/// Resolve an archive entry name to a destination beneath `root`.
///
/// Backslashes are treated as separators. The joined path is normalised
/// lexically and must be `root` itself or lie strictly beneath it; `..`
/// escapes and absolute names pointing elsewhere are rejected. Nothing is
/// touched on disk.
pub fn resolve_entry_path(root: &Path, entry_name: &str) -> Result<PathBuf, UnsafePathError> {
    let normalized_name = entry_name.replace('\\', "/");
    let root = normalize_lexically(root);
    let candidate = normalize_lexically(&root.join(&normalized_name));

    if candidate == root || candidate.starts_with(&root) {
        Ok(candidate)
    } else {
        Err(UnsafePathError {
            entry: entry_name.to_string(),
        })
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => {
                out = PathBuf::from(prefix.as_os_str());
            }
            Component::RootDir => {
                out.push(Component::RootDir.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the filesystem root is a no-op, which still
                // lands outside any non-root extraction directory.
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/scratch/book")
    }

    #[test]
    fn plain_entries_resolve_beneath_root() {
        let resolved = resolve_entry_path(&root(), "OEBPS/chapter1.xhtml").expect("safe");
        assert_eq!(resolved, PathBuf::from("/scratch/book/OEBPS/chapter1.xhtml"));
    }

    #[test]
    fn backslashes_are_separators() {
        let resolved = resolve_entry_path(&root(), "OEBPS\\images\\a.png").expect("safe");
        assert_eq!(resolved, PathBuf::from("/scratch/book/OEBPS/images/a.png"));
    }

    #[test]
    fn directory_entries_keep_their_path() {
        let resolved = resolve_entry_path(&root(), "META-INF/").expect("safe");
        assert_eq!(resolved, PathBuf::from("/scratch/book/META-INF"));
    }

    #[test]
    fn inner_parent_segments_that_stay_inside_are_allowed() {
        let resolved = resolve_entry_path(&root(), "OEBPS/text/../style.css").expect("safe");
        assert_eq!(resolved, PathBuf::from("/scratch/book/OEBPS/style.css"));
    }

    #[test]
    fn root_itself_is_allowed() {
        let resolved = resolve_entry_path(&root(), "./").expect("safe");
        assert_eq!(resolved, root());
    }

    #[test]
    fn parent_escape_is_rejected() {
        let err = resolve_entry_path(&root(), "../escape.txt").expect_err("unsafe");
        assert_eq!(err.entry, "../escape.txt");
    }

    #[test]
    fn nested_escape_is_rejected() {
        assert!(resolve_entry_path(&root(), "OEBPS/../../escape.txt").is_err());
        assert!(resolve_entry_path(&root(), "..\\..\\escape.txt").is_err());
    }

    #[test]
    fn sibling_with_shared_prefix_is_rejected() {
        assert!(resolve_entry_path(&root(), "../book-evil/x").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn absolute_entry_outside_root_is_rejected() {
        assert!(resolve_entry_path(&root(), "/etc/passwd").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn absolute_entry_aliasing_inside_root_is_allowed() {
        let resolved = resolve_entry_path(&root(), "/scratch/book/a.txt").expect("safe");
        assert_eq!(resolved, PathBuf::from("/scratch/book/a.txt"));
    }
}
