//! Translation units and their immutable generations.
//!
//! A [`TranslationUnit`] is a stable handle for one file. Each successful
//! parse is published as a new [`Snapshot`] by atomically swapping the
//! unit's current pointer, so readers never see a half-built tree and a
//! reader holding an old snapshot keeps seeing it until it re-fetches.

use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::CompileFlags;
use crate::error::{Error, Result};
use crate::kind::CursorKind;
use crate::loader::Parsed;
use crate::tree::{ByKind, Cursor, CursorTree};
use crate::types::{Diagnostic, FileId, Fingerprint, SourceExtent, SourceLocation};

/// One immutable generation of a translation unit.
#[derive(Debug)]
pub struct Snapshot {
    /// Generation number, starting at 1 for the first load
    pub generation: u64,
    /// The cursor tree of this generation
    pub tree: Arc<CursorTree>,
    /// Diagnostics from the parse that produced this generation
    pub diagnostics: Vec<Diagnostic>,
    /// Fingerprint of the parsed content
    pub fingerprint: Fingerprint,
    /// Flags the parse ran with
    pub flags: CompileFlags,
}

impl Snapshot {
    fn from_parsed(generation: u64, parsed: Parsed) -> Self {
        Self {
            generation,
            tree: parsed.tree,
            diagnostics: parsed.diagnostics,
            fingerprint: parsed.fingerprint,
            flags: parsed.flags,
        }
    }

    /// The translation unit cursor.
    #[must_use]
    pub fn root(&self) -> Cursor {
        self.tree.root()
    }

    /// Innermost cursor whose full extent contains `location`.
    #[must_use]
    pub fn find_at_position(&self, location: SourceLocation) -> Option<Cursor> {
        self.tree.cursor_at(location)
    }

    /// Innermost cursor at a 1-indexed line and column.
    #[must_use]
    pub fn find_at(&self, line: u32, column: u32) -> Option<Cursor> {
        let location = self.tree.line_index().location_at(line, column)?;
        self.find_at_position(location)
    }

    /// All cursors of `kind`, lazily, in source order.
    #[must_use]
    pub fn find_by_kind(&self, kind: CursorKind) -> ByKind {
        self.tree.by_kind(kind)
    }

    /// All cursors matching `predicate`, in source order.
    pub fn search<P>(&self, predicate: P) -> Vec<Cursor>
    where
        P: Fn(&Cursor) -> bool,
    {
        self.tree.cursors().filter(|c| predicate(c)).collect()
    }

    /// Variable, field and parameter declarations.
    #[must_use]
    pub fn variables(&self) -> Vec<Cursor> {
        self.search(|c| c.kind().is_variable())
    }

    /// Function-like declarations (functions, methods, constructors, ...).
    #[must_use]
    pub fn functions(&self) -> Vec<Cursor> {
        self.search(|c| c.kind().is_function())
    }

    /// Error-severity diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity.is_error())
    }

    /// The (kind, extent) sequence of the tree in preorder.
    #[must_use]
    pub fn structure(&self) -> Vec<(CursorKind, SourceExtent)> {
        self.tree.structure()
    }
}

/// Shared handle to one file's current generation.
#[derive(Debug)]
pub struct TranslationUnit {
    id: FileId,
    path: PathBuf,
    current: ArcSwap<Snapshot>,
    released: AtomicBool,
}

impl TranslationUnit {
    /// Create a unit whose first generation is `parsed`.
    pub(crate) fn new(id: FileId, path: PathBuf, parsed: Parsed) -> Self {
        Self {
            id,
            path,
            current: ArcSwap::from_pointee(Snapshot::from_parsed(1, parsed)),
            released: AtomicBool::new(false),
        }
    }

    /// Interned file identity.
    #[must_use]
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Canonical path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current generation.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnitReleased` once the unit has been released.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        if self.is_released() {
            return Err(Error::UnitReleased {
                path: self.path.clone(),
            });
        }
        Ok(self.current.load_full())
    }

    /// Generation number of the current snapshot.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Whether the unit has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Swap in a new generation. Returns the new generation number, or `None`
    /// if the unit was released (the parse is discarded).
    pub(crate) fn publish(&self, parsed: Parsed) -> Option<u64> {
        if self.is_released() {
            return None;
        }
        let previous = self.current.rcu(|prev| {
            Arc::new(Snapshot::from_parsed(prev.generation + 1, parsed.clone()))
        });
        Some(previous.generation + 1)
    }

    /// Mark the unit released; later `snapshot()` calls fail.
    pub(crate) fn release(&self) {
        self.released.store(true, Ordering::Release);
    }
}
