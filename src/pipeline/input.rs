//! Input enumeration: expand the glob pattern into a sorted list of PDFs.
//!
//! Every match is checked for the `%PDF` magic bytes up front, so a stray
//! text file in the asset directory fails the run before any timing starts
//! rather than halfway through the second strategy.

use crate::error::BenchError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Expand `pattern` into the documents to benchmark, sorted by path.
///
/// Directories matched by the pattern are skipped.
pub fn resolve_inputs(pattern: &str) -> Result<Vec<PathBuf>, BenchError> {
    let entries = glob::glob(pattern).map_err(|e| BenchError::InvalidPattern {
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            BenchError::io(path, e.into_error())
        })?;
        if path.is_dir() {
            debug!("Skipping directory match: {}", path.display());
            continue;
        }
        check_pdf(&path)?;
        paths.push(path);
    }

    if paths.is_empty() {
        return Err(BenchError::NoInputs {
            pattern: pattern.to_string(),
        });
    }

    paths.sort();
    info!("Matched {} documents for '{}'", paths.len(), pattern);
    Ok(paths)
}

/// Validate that `path` is a readable file starting with `%PDF`.
pub fn check_pdf(path: &Path) -> Result<(), BenchError> {
    let mut f = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(BenchError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(BenchError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    match f.read_exact(&mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(BenchError::NotAPdf {
                path: path.to_path_buf(),
                magic,
            });
        }
        Err(e) => return Err(BenchError::io(path, e)),
    }
    if &magic != b"%PDF" {
        return Err(BenchError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, bytes).unwrap();
        p
    }

    #[test]
    fn matches_are_sorted() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b.pdf", b"%PDF-1.4\n");
        write(tmp.path(), "a.pdf", b"%PDF-1.7\n");
        write(tmp.path(), "c.txt", b"not matched");

        let pattern = format!("{}/*.pdf", tmp.path().display());
        let inputs = resolve_inputs(&pattern).unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn no_match_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let pattern = format!("{}/*.pdf", tmp.path().display());
        let err = resolve_inputs(&pattern).unwrap_err();
        assert!(matches!(err, BenchError::NoInputs { .. }));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let err = resolve_inputs("[unclosed").unwrap_err();
        assert!(matches!(err, BenchError::InvalidPattern { .. }));
    }

    #[test]
    fn non_pdf_match_is_rejected() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "fake.pdf", b"PK\x03\x04zip");
        let pattern = format!("{}/*.pdf", tmp.path().display());
        let err = resolve_inputs(&pattern).unwrap_err();
        match err {
            BenchError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn truncated_file_is_not_a_pdf() {
        let tmp = TempDir::new().unwrap();
        let p = write(tmp.path(), "short.pdf", b"%P");
        assert!(matches!(check_pdf(&p), Err(BenchError::NotAPdf { .. })));
    }

    #[test]
    fn bare_magic_is_enough() {
        let tmp = TempDir::new().unwrap();
        let p = write(tmp.path(), "tiny.pdf", b"%PDF");
        assert!(check_pdf(&p).is_ok());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = check_pdf(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, BenchError::FileNotFound { .. }));
    }
}
