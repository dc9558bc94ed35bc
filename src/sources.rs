//! Source enumeration: list the Visio files of a directory, deterministically.
//!
//! Callers feed the resulting names straight into a
//! [`crate::config::ConversionRequest`], so the contract is strict: regular
//! files directly in the directory (no recursion), case-insensitive extension
//! match, lexicographic order. Two calls over an unchanged directory return
//! identical lists, which keeps output ordering reproducible across runs.

use crate::error::ConvertError;
use std::path::Path;
use tracing::debug;

/// Recognised source extensions, lower-case, without the dot.
pub const SOURCE_EXTENSIONS: &[&str] = &["vsdx", "vsd"];

/// List the Visio files in `dir`, sorted lexicographically by name.
///
/// Only regular files directly in `dir` are considered; sub-directories are
/// not descended into. Extension matching is case-insensitive, so `FLOW.VSDX`
/// is found. A directory that cannot be read yields
/// [`ConvertError::Directory`], never a raw I/O error.
pub fn list_sources(dir: &Path) -> Result<Vec<String>, ConvertError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ConvertError::Directory {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConvertError::Directory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let file_type = entry.file_type().map_err(|e| ConvertError::Directory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if has_source_extension(&name) {
            names.push(name);
        }
    }

    names.sort();
    debug!(dir = %dir.display(), found = names.len(), "enumerated source files");
    Ok(names)
}

fn has_source_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            SOURCE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn filters_by_extension_case_insensitively() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.vsd");
        touch(dir.path(), "A.VSDX");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "archive.vsdx.bak");

        let names = list_sources(dir.path()).unwrap();
        assert_eq!(names, vec!["A.VSDX", "b.vsd"]);
    }

    #[test]
    fn ignores_subdirectories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested.vsdx")).unwrap();
        touch(dir.path(), "real.vsdx");

        let names = list_sources(dir.path()).unwrap();
        assert_eq!(names, vec!["real.vsdx"]);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let dir = TempDir::new().unwrap();
        for name in ["c.vsd", "a.vsdx", "b.vsdx"] {
            touch(dir.path(), name);
        }

        let first = list_sources(dir.path()).unwrap();
        let second = list_sources(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec!["a.vsdx", "b.vsdx", "c.vsd"]);
    }

    #[test]
    fn empty_directory_yields_empty_list() {
        let dir = TempDir::new().unwrap();
        assert!(list_sources(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_a_directory_error() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");
        let err = list_sources(&gone).unwrap_err();
        assert!(matches!(err, ConvertError::Directory { .. }));
    }
}
