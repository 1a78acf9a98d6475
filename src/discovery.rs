//! Record file discovery

use glob::{glob_with, MatchOptions};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EtlError;

/// All files under `root` (recursively) whose extension is `extension`, as
/// absolute paths in sorted order.
///
/// An empty directory yields an empty list; a missing root is an error.
pub fn find_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, EtlError> {
    let root = fs::canonicalize(root).map_err(|e| EtlError::io(root, e))?;
    if !root.is_dir() {
        return Err(EtlError::io(
            &root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = format!("{}/**/*.{}", escaped_root, extension.trim_start_matches('.'));

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files = Vec::new();
    for entry in glob_with(&pattern, options)? {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            EtlError::io(path, e.into_error())
        })?;
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
