//! # Janus: C++ Cursor Inspection and Incremental Monitoring
//!
//! Janus parses C++ translation units into immutable trees of classified
//! cursors, answers structural queries over them, and keeps them fresh while
//! the files on disk change.
//!
//! ## Design Philosophy
//!
//! - **Structure, not semantics** - Cursors come from the syntax tree; there is no type checking
//! - **Immutable generations** - Every re-parse publishes a new tree; readers are never disturbed
//! - **Total classification** - Unfamiliar constructs become `Unclassified`, never a failed load
//! - **Failures stay local** - One broken file never affects the units of other files
//!
//! ## Quick Start
//!
//! ```no_run
//! use janus::{CursorKind, JanusConfig, Workspace};
//! use std::path::Path;
//!
//! let workspace = Workspace::new(JanusConfig::default())?;
//! let unit = workspace.load(Path::new("src/main.cpp"))?;
//!
//! let snapshot = unit.snapshot()?;
//! for stmt in snapshot.find_by_kind(CursorKind::DoStmt) {
//!     println!("do-while at {}", stmt.extent());
//! }
//!
//! if let Some(cursor) = snapshot.find_at(26, 11) {
//!     println!("{}", cursor.display_name());
//! }
//! # Ok::<(), janus::Error>(())
//! ```
//!
//! ## Monitoring
//!
//! [`Monitor`] re-parses watched files when their content changes, coalescing
//! bursts of edits into one parse and publishing each new generation through
//! [`TranslationUnit`].

pub mod backend;
pub mod config;
mod error;
mod extent;
mod kind;
mod loader;
pub mod monitor;
mod parallel;
pub mod query;
mod tree;
mod types;
mod unit;

pub use backend::{ParseBackend, ParseOutput, ParseRequest, TreeSitterBackend};
pub use config::{CompileFlags, JanusConfig, MonitorConfig};
pub use error::{Error, LoadError, LoadErrorKind, Result, WatchError};
pub use extent::LineIndex;
pub use kind::{CursorKind, KindCategory, Operator, UnknownKind};
pub use loader::{Parsed, normalize_path};
pub use monitor::{FileState, Monitor, MonitorEvent, MonitorUpdate};
pub use parallel::LoadStats;
pub use tree::{ByKind, Cursor, CursorDetails, CursorId, CursorTree, Preorder};
pub use types::{Diagnostic, FileId, Fingerprint, Severity, SourceExtent, SourceLocation};
pub use unit::{Snapshot, TranslationUnit};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, warn};

use parallel::{ParseJob, parse_batch};

#[derive(Debug, Default)]
struct Registry {
    units: HashMap<PathBuf, Arc<TranslationUnit>>,
    files: HashMap<PathBuf, FileId>,
}

/// The explicit context shared by loading, queries and monitoring.
///
/// `Workspace` owns the parse backend, the configuration and the registry of
/// translation units keyed by canonical path. Everything is reachable through
/// `&self`, so it can be shared as `Arc<Workspace>` with a [`Monitor`].
pub struct Workspace {
    config: JanusConfig,
    backend: Arc<dyn ParseBackend>,
    registry: RwLock<Registry>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("backend", &self.backend.name())
            .field("units", &self.read().units.len())
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Create a workspace using the tree-sitter backend.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn new(config: JanusConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(TreeSitterBackend))
    }

    /// Create a workspace with a custom parse backend.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn with_backend(config: JanusConfig, backend: Arc<dyn ParseBackend>) -> Result<Self> {
        config.monitor.validate()?;
        Ok(Self {
            config,
            backend,
            registry: RwLock::new(Registry::default()),
        })
    }

    /// The configuration this workspace was built with.
    #[must_use]
    pub fn config(&self) -> &JanusConfig {
        &self.config
    }

    // === Loading ===

    /// Load (or re-load) one file.
    ///
    /// The first successful load creates the unit at generation 1; later loads
    /// of the same path publish the next generation of the same unit. On
    /// failure an existing unit keeps its previous generation.
    ///
    /// # Errors
    ///
    /// Returns `Error::Load` if the file cannot be read or has no usable tree.
    pub fn load(&self, path: &Path) -> Result<Arc<TranslationUnit>> {
        let key = normalize_path(path);
        let file = self.file_id(&key);
        let parsed = self.parse(&key, file)?;
        let (unit, _) = self.install(&key, file, parsed);
        Ok(unit)
    }

    /// Load many files in parallel. Failures are per file.
    pub fn load_all<P: AsRef<Path>>(&self, paths: &[P]) -> LoadStats {
        let start = Instant::now();
        let jobs: Vec<ParseJob> = paths
            .iter()
            .map(|p| {
                let path = normalize_path(p.as_ref());
                let file = self.file_id(&path);
                ParseJob { path, file }
            })
            .collect();

        let mut stats = LoadStats::default();
        for result in parse_batch(self.backend.as_ref(), jobs, &self.config.flags) {
            match result.outcome {
                Ok(parsed) => {
                    stats.record(&parsed);
                    self.install(&result.job.path, result.job.file, parsed);
                }
                Err(e) => {
                    warn!(path = %e.path.display(), error = %e, "Failed to load file");
                    stats.errors.push(e);
                }
            }
        }
        stats.duration = start.elapsed();
        debug!(
            loaded = stats.files_loaded,
            failed = stats.errors.len(),
            gaps = stats.classification_gaps,
            elapsed_ms = stats.duration.as_millis(),
            "Batch load complete"
        );
        stats
    }

    // === Registry ===

    /// The unit registered for `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFile` if no unit is loaded for the path.
    pub fn unit(&self, path: &Path) -> Result<Arc<TranslationUnit>> {
        let key = normalize_path(path);
        self.read()
            .units
            .get(&key)
            .cloned()
            .ok_or(Error::UnknownFile { path: key })
    }

    /// Every registered unit, ordered by path.
    #[must_use]
    pub fn units(&self) -> Vec<Arc<TranslationUnit>> {
        let mut units: Vec<_> = self.read().units.values().cloned().collect();
        units.sort_by(|a, b| a.path().cmp(b.path()));
        units
    }

    /// Unregister and release the unit for `path`.
    ///
    /// Handles still held elsewhere fail their next `snapshot()` with
    /// `Error::UnitReleased`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFile` if no unit is loaded for the path.
    pub fn release(&self, path: &Path) -> Result<Arc<TranslationUnit>> {
        let key = normalize_path(path);
        let unit = self
            .write()
            .units
            .remove(&key)
            .ok_or_else(|| Error::UnknownFile { path: key.clone() })?;
        unit.release();
        debug!(path = %key.display(), generation = unit.generation(), "Released translation unit");
        Ok(unit)
    }

    // === Parse / publish split (used by the monitor) ===

    /// Interned identity for a canonical path; stable across releases.
    pub(crate) fn file_id(&self, key: &Path) -> FileId {
        if let Some(id) = self.read().files.get(key) {
            return *id;
        }
        let mut registry = self.write();
        let next = FileId(u32::try_from(registry.files.len()).unwrap_or(u32::MAX));
        *registry.files.entry(key.to_path_buf()).or_insert(next)
    }

    /// Read and parse without touching the registry.
    pub(crate) fn parse(&self, key: &Path, file: FileId) -> std::result::Result<Parsed, LoadError> {
        loader::load_file(self.backend.as_ref(), key, file, &self.config.flags)
    }

    /// Publish a parse: a new unit at generation 1, or the next generation of
    /// the registered one.
    pub(crate) fn install(&self, key: &Path, file: FileId, parsed: Parsed) -> (Arc<TranslationUnit>, u64) {
        let mut registry = self.write();
        if let Some(unit) = registry.units.get(key) {
            // registered units are never released: release removes them first
            let generation = unit.publish(parsed).unwrap_or_else(|| unit.generation());
            return (Arc::clone(unit), generation);
        }
        let unit = Arc::new(TranslationUnit::new(file, key.to_path_buf(), parsed));
        registry.units.insert(key.to_path_buf(), Arc::clone(&unit));
        (unit, 1)
    }

    pub(crate) fn is_registered(&self, key: &Path) -> bool {
        self.read().units.contains_key(key)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}
