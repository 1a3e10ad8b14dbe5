//! Error types for Janus operations.
//!
//! Errors are categorized into two main types:
//!
//! - **`Error`**: Top-level errors returned by the workspace, query, and monitor APIs
//! - **`LoadError`**: File-level load failures that are scoped to one translation unit
//!
//! ## Error Philosophy
//!
//! A failure is scoped to the single file it originates from:
//! - One unreadable or unparsable file never disturbs the units of other files
//! - A failed re-parse leaves the previous generation of its unit queryable
//! - Constructs the classifier does not recognize are not errors at all; they
//!   become `Unclassified` cursors and are surfaced as a gap count
//!
//! ## Error Categorization
//!
//! `LoadErrorKind` uses a 4xx/5xx style categorization:
//! - Input problems (user's fault): the parser produced no usable tree
//! - Environment problems: the file is missing or unreadable

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Diagnostic;

/// Result type for Janus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for Janus operations.
#[derive(Debug, Error)]
pub enum Error {
    /// File system operation failed outside of a load
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Loading a translation unit failed
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The unit was released (its file was unwatched or deleted)
    #[error("translation unit released: {}", path.display())]
    UnitReleased {
        /// Path of the released unit
        path: PathBuf,
    },

    /// No translation unit is registered for the path
    #[error("no translation unit loaded for {}", path.display())]
    UnknownFile {
        /// Path that was looked up
        path: PathBuf,
    },

    /// Setting up an OS-level watch failed for one path
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),

    /// The parse worker pool could not be created
    #[error("worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// The monitor's coordination loop is no longer running
    #[error("monitor is not running")]
    MonitorStopped,
}

/// Failure to load one translation unit.
///
/// Carries the diagnostics gathered before the failure so callers can show
/// why the parser gave up.
#[derive(Debug, Clone, Error)]
#[error("{}: {message} ({kind})", path.display())]
pub struct LoadError {
    /// Path to the file that failed
    pub path: PathBuf,
    /// Category of the failure
    pub kind: LoadErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Diagnostics reported by the backend, if it got that far
    pub diagnostics: Vec<Diagnostic>,
}

/// Categorization of load failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    // === Input Problems (analogous to HTTP 4xx) ===
    /// The parser reported only errors and produced no usable tree
    ParseFailure,

    // === Environment Problems (analogous to HTTP 5xx) ===
    /// The file is missing or could not be read
    IoFailure,
}

impl std::fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseFailure => write!(f, "parse failure"),
            Self::IoFailure => write!(f, "I/O failure"),
        }
    }
}

impl LoadErrorKind {
    /// Returns `true` if this is an input problem (4xx-style).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::ParseFailure)
    }

    /// Returns `true` if this is an environment problem (5xx-style).
    #[must_use]
    pub fn is_internal_error(&self) -> bool {
        matches!(self, Self::IoFailure)
    }
}

impl LoadError {
    /// Create a new load error.
    #[must_use]
    pub fn new(path: PathBuf, kind: LoadErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Create an I/O failure for a file.
    #[must_use]
    pub fn io_failure(path: PathBuf, error: &std::io::Error) -> Self {
        Self::new(path, LoadErrorKind::IoFailure, error.to_string())
    }

    /// Create a parse failure carrying the backend's diagnostics.
    #[must_use]
    pub fn parse_failure(path: PathBuf, diagnostics: Vec<Diagnostic>) -> Self {
        let errors = diagnostics.iter().filter(|d| d.severity.is_error()).count();
        Self {
            path,
            kind: LoadErrorKind::ParseFailure,
            message: format!("no usable syntax tree ({errors} errors)"),
            diagnostics,
        }
    }
}

/// Failure to set up an OS-level watch for one path.
#[derive(Debug, Error)]
#[error("cannot watch {}: {message}", path.display())]
pub struct WatchError {
    /// Path that could not be watched
    pub path: PathBuf,
    /// Reason reported by the OS watcher
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_kind_categorization() {
        assert!(LoadErrorKind::ParseFailure.is_input_error());
        assert!(!LoadErrorKind::ParseFailure.is_internal_error());

        assert!(LoadErrorKind::IoFailure.is_internal_error());
        assert!(!LoadErrorKind::IoFailure.is_input_error());
    }

    #[test]
    fn load_error_display_includes_path_and_kind() {
        let error = LoadError::new(
            PathBuf::from("test/broken.cpp"),
            LoadErrorKind::ParseFailure,
            "unexpected token",
        );

        let display = error.to_string();
        assert!(display.contains("test/broken.cpp"));
        assert!(display.contains("unexpected token"));
        assert!(display.contains("parse failure"));
    }

    #[test]
    fn io_failure_keeps_os_message() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let error = LoadError::io_failure(PathBuf::from("missing.cpp"), &io);

        assert_eq!(error.kind, LoadErrorKind::IoFailure);
        assert!(error.message.contains("no such file"));
        assert!(error.diagnostics.is_empty());
    }

    #[test]
    fn released_error_names_the_path() {
        let error = Error::UnitReleased {
            path: PathBuf::from("gone.cpp"),
        };
        assert!(error.to_string().contains("gone.cpp"));
    }
}
