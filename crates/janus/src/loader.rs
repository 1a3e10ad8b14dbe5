//! Translation unit loading: read a file, run the backend, classify failures.
//!
//! The loader is pure with respect to the workspace: it produces a [`Parsed`]
//! value and never touches a registry. Publishing is a separate step so the
//! monitor can decide on its own thread whether a finished parse is still
//! wanted.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::backend::{ParseBackend, ParseRequest};
use crate::config::CompileFlags;
use crate::error::LoadError;
use crate::tree::CursorTree;
use crate::types::{Diagnostic, FileId, Fingerprint};

/// A successful parse, ready to be published as a new generation.
#[derive(Debug, Clone)]
pub struct Parsed {
    /// The classified tree
    pub tree: Arc<CursorTree>,
    /// Diagnostics reported by the backend (warnings and recovered errors)
    pub diagnostics: Vec<Diagnostic>,
    /// Fingerprint of the content that was parsed
    pub fingerprint: Fingerprint,
    /// Flags the parse ran with
    pub flags: CompileFlags,
}

/// Read and parse one file.
///
/// # Errors
///
/// Returns a `LoadError` of kind `IoFailure` if the file cannot be read, or
/// `ParseFailure` (with the backend's diagnostics) if the backend produced no
/// usable tree.
pub fn load_file(
    backend: &dyn ParseBackend,
    path: &Path,
    file: FileId,
    flags: &CompileFlags,
) -> Result<Parsed, LoadError> {
    let start = Instant::now();
    let metadata = std::fs::metadata(path).map_err(|e| LoadError::io_failure(path.to_path_buf(), &e))?;
    if metadata.is_dir() {
        return Err(LoadError::io_failure(
            path.to_path_buf(),
            &std::io::Error::other("is a directory"),
        ));
    }
    let source = std::fs::read(path).map_err(|e| LoadError::io_failure(path.to_path_buf(), &e))?;
    let fingerprint = Fingerprint::from_contents(&metadata, &source);

    let args = flags.to_args();
    let output = backend.parse(&ParseRequest {
        path,
        file,
        source: &source,
        args: &args,
    });

    let Some(tree) = output.tree else {
        debug!(
            path = %path.display(),
            backend = backend.name(),
            diagnostics = output.diagnostics.len(),
            "Parse produced no usable tree"
        );
        return Err(LoadError::parse_failure(path.to_path_buf(), output.diagnostics));
    };

    debug!(
        path = %path.display(),
        backend = backend.name(),
        cursors = tree.len(),
        gaps = tree.classification_gaps(),
        elapsed_ms = start.elapsed().as_millis(),
        "Loaded translation unit"
    );

    Ok(Parsed {
        tree: Arc::new(tree),
        diagnostics: output.diagnostics,
        fingerprint,
        flags: flags.clone(),
    })
}

/// Canonical registry key for a path.
///
/// Existing files are canonicalized. A file that no longer exists (or does
/// not exist yet) is keyed by its canonical parent directory plus file name,
/// so a deleted file still maps to the key it was registered under.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map_or_else(|_| absolute.clone(), |p| p.join(name)),
        _ => absolute,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TreeSitterBackend;
    use crate::error::LoadErrorKind;
    use crate::types::Severity;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn loads_file_with_fingerprint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.cpp");
        fs::write(&path, "int main() { return 0; }\n").unwrap();

        let parsed = load_file(&TreeSitterBackend, &path, FileId(3), &CompileFlags::default()).unwrap();
        assert_eq!(parsed.tree.file(), FileId(3));
        assert_eq!(parsed.fingerprint.size_bytes, 25);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn missing_file_is_io_failure() {
        let dir = TempDir::new().unwrap();
        let err = load_file(
            &TreeSitterBackend,
            &dir.path().join("absent.cpp"),
            FileId(0),
            &CompileFlags::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::IoFailure);
        assert!(err.kind.is_internal_error());
    }

    #[test]
    fn directory_is_io_failure() {
        let dir = TempDir::new().unwrap();
        let err = load_file(&TreeSitterBackend, dir.path(), FileId(0), &CompileFlags::default())
            .unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::IoFailure);
    }

    #[test]
    fn garbage_is_parse_failure_with_diagnostics() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.cpp");
        fs::write(&path, "}}} ))) ]]]\n").unwrap();

        let err = load_file(&TreeSitterBackend, &path, FileId(0), &CompileFlags::default())
            .unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::ParseFailure);
        assert!(err.kind.is_input_error());
        assert!(!err.diagnostics.is_empty());
    }

    #[test]
    fn warnings_keep_the_tree() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("w.cpp");
        fs::write(&path, "int x;\n").unwrap();
        let flags = CompileFlags {
            standard: Some("c++99".to_string()),
            ..CompileFlags::default()
        };

        let parsed = load_file(&TreeSitterBackend, &path, FileId(0), &flags).unwrap();
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].severity, Severity::Warning);
        assert_eq!(parsed.flags, flags);
    }

    #[test]
    fn normalize_keeps_deleted_files_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.cpp");
        fs::write(&path, "int x;").unwrap();
        let before = normalize_path(&path);
        fs::remove_file(&path).unwrap();
        assert_eq!(normalize_path(&path), before);
    }
}
