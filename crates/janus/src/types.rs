//! Domain types for Janus cursor inspection.
//!
//! These types represent the core value model:
//! - **Positions**: `FileId`, `SourceLocation`, `SourceExtent`
//! - **Parse results**: `Diagnostic`, `Severity`
//! - **Change detection**: `Fingerprint`
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | File identity | Interned `FileId` | Locations stay `Copy` and cheap to compare |
//! | Ordering | By (file, byte offset) | Line/column are derived from the offset |
//! | Columns | 1-indexed bytes | Matches compiler diagnostics |
//! | Fingerprint equality | Size + content hash | A `touch` alone does not trigger a re-parse |

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use std::time::UNIX_EPOCH;

// ============================================================================
// Strongly-typed ID wrappers
// ============================================================================

/// Identity of a source file within a workspace.
///
/// Assigned once per canonical path and kept across re-parses and releases,
/// so locations from different generations of the same file compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    /// Extract the raw value.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for FileId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ============================================================================
// Positions
// ============================================================================

/// A position in a source file.
///
/// Lines and columns are 1-indexed; columns count bytes. Immutable once
/// computed from a buffer snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File the location belongs to
    pub file: FileId,
    /// Byte offset from the start of the file
    pub offset: u32,
    /// Line (1-indexed)
    pub line: u32,
    /// Column (1-indexed, in bytes)
    pub column: u32,
}

impl SourceLocation {
    /// Create a location.
    #[must_use]
    pub fn new(file: FileId, offset: u32, line: u32, column: u32) -> Self {
        Self {
            file,
            offset,
            line,
            column,
        }
    }
}

impl PartialOrd for SourceLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.file
            .cmp(&other.file)
            .then(self.offset.cmp(&other.offset))
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open source range `[start, end)`.
///
/// Invariant: `start <= end` and both ends lie in the same file. A zero-width
/// extent (`start == end`) still covers the position it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceExtent {
    /// First covered position
    pub start: SourceLocation,
    /// Position one past the last covered byte
    pub end: SourceLocation,
}

impl SourceExtent {
    /// Create a new extent with validation.
    ///
    /// Returns `None` if the ends are in different files or `end` is before `start`.
    #[must_use]
    pub fn new(start: SourceLocation, end: SourceLocation) -> Option<Self> {
        if start.file != end.file || end.offset < start.offset {
            return None;
        }
        Some(Self { start, end })
    }

    /// A zero-width extent at `at`.
    #[must_use]
    pub fn empty_at(at: SourceLocation) -> Self {
        Self { start: at, end: at }
    }

    /// File this extent belongs to.
    #[must_use]
    pub fn file(&self) -> FileId {
        self.start.file
    }

    /// Number of bytes covered.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end.offset - self.start.offset
    }

    /// Whether this extent covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Whether `location` falls inside this extent.
    #[must_use]
    pub fn contains(&self, location: SourceLocation) -> bool {
        if location.file != self.file() {
            return false;
        }
        if self.is_empty() {
            return location.offset == self.start.offset;
        }
        self.start.offset <= location.offset && location.offset < self.end.offset
    }

    /// Whether `other` lies entirely inside this extent (equal extents contain each other).
    #[must_use]
    pub fn contains_extent(&self, other: &SourceExtent) -> bool {
        self.file() == other.file()
            && self.start.offset <= other.start.offset
            && other.end.offset <= self.end.offset
    }

    /// Byte range covered, for slicing the source buffer.
    #[must_use]
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start.offset as usize..self.end.offset as usize
    }
}

impl std::fmt::Display for SourceExtent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})-({})", self.start, self.end)
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Severity of a parse diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The tree is still usable
    Warning,
    /// Part of the source could not be parsed
    Error,
}

impl Severity {
    /// Returns `true` for [`Severity::Error`].
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Convert to display string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A message reported by the parsing backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// How serious the problem is
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
    /// Where the problem was found; `None` for problems with the flags themselves
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    /// Create a warning.
    #[must_use]
    pub fn warning(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            location,
        }
    }

    /// Create an error.
    #[must_use]
    pub fn error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            location,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{}: {}: {}", loc, self.severity.as_str(), self.message),
            None => write!(f, "{}: {}", self.severity.as_str(), self.message),
        }
    }
}

// ============================================================================
// Change detection
// ============================================================================

/// Cheap signal used to decide whether a watched file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// File modification time in nanoseconds since epoch
    pub mtime_ns: i64,
    /// File size in bytes
    pub size_bytes: u64,
    /// xxh3 hash of the file content
    pub content_hash: u64,
}

impl Fingerprint {
    /// Compute a fingerprint from already-read content and its metadata.
    #[must_use]
    pub fn from_contents(metadata: &std::fs::Metadata, content: &[u8]) -> Self {
        Self {
            mtime_ns: mtime_ns(metadata),
            size_bytes: content.len() as u64,
            content_hash: xxhash_rust::xxh3::xxh3_64(content),
        }
    }

    /// Read a file and fingerprint it.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be stat'ed or read.
    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let content = std::fs::read(path)?;
        Ok(Self::from_contents(&metadata, &content))
    }

    /// Whether `metadata` could describe different content, without reading the file.
    #[must_use]
    pub fn stat_differs(&self, metadata: &std::fs::Metadata) -> bool {
        self.size_bytes != metadata.len() || self.mtime_ns != mtime_ns(metadata)
    }

    /// Whether two fingerprints describe the same content.
    ///
    /// The modification time is deliberately not compared.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.size_bytes == other.size_bytes && self.content_hash == other.content_hash
    }
}

#[allow(clippy::cast_possible_truncation)] // Nanoseconds fit in i64 for centuries
fn mtime_ns(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos() as i64)
}
