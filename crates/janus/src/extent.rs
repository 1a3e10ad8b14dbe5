//! Extent resolution: byte offsets to line/column locations and back.
//!
//! Every cursor extent is computed from native byte ranges through a
//! [`LineIndex`] built once per buffer snapshot, so re-parsing an unchanged
//! buffer yields byte-identical extents.

// Offsets are stored as u32; source files beyond 4 GiB are not supported.
#![allow(clippy::cast_possible_truncation)]

use crate::types::{FileId, SourceExtent, SourceLocation};

/// Line-start table for one source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    file: FileId,
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    /// Build the index for `source`.
    #[must_use]
    pub fn new(file: FileId, source: &[u8]) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                source
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| **b == b'\n')
                    .map(|(i, _)| i as u32 + 1),
            )
            .collect();
        Self {
            file,
            line_starts,
            len: source.len() as u32,
        }
    }

    /// File this index belongs to.
    #[must_use]
    pub fn file(&self) -> FileId {
        self.file
    }

    /// Length of the buffer in bytes.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of lines (a trailing newline starts a final empty line).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Location of a byte offset. Offsets past the end clamp to the end.
    #[must_use]
    pub fn location(&self, offset: u32) -> SourceLocation {
        let offset = offset.min(self.len);
        let line = self.line_starts.partition_point(|start| *start <= offset);
        let line_start = self.line_starts[line - 1];
        SourceLocation::new(self.file, offset, line as u32, offset - line_start + 1)
    }

    /// Location of a 1-indexed line and byte column.
    ///
    /// Returns `None` if the line does not exist or the column runs past the
    /// end of the line (the position just after the last character is allowed).
    #[must_use]
    pub fn location_at(&self, line: u32, column: u32) -> Option<SourceLocation> {
        if line == 0 || column == 0 {
            return None;
        }
        let start = *self.line_starts.get(line as usize - 1)?;
        let line_end = self
            .line_starts
            .get(line as usize)
            .map_or(self.len, |next| next - 1);
        let offset = start.checked_add(column - 1)?;
        if offset > line_end {
            return None;
        }
        Some(SourceLocation::new(self.file, offset, line, column))
    }

    /// Extent for a native byte range.
    #[must_use]
    pub fn extent(&self, range: std::ops::Range<usize>) -> SourceExtent {
        let start = self.location(range.start as u32);
        let end = self.location(range.end.max(range.start) as u32);
        SourceExtent { start, end }
    }

    /// Zero-width extent at `offset`.
    #[must_use]
    pub fn point(&self, offset: usize) -> SourceExtent {
        SourceExtent::empty_at(self.location(offset as u32))
    }
}

/// Shrink `range` so it does not end in whitespace.
///
/// Preprocessor directives own their terminating newline in the native tree;
/// their cursors end at the last visible character instead.
#[must_use]
pub fn trim_trailing_whitespace(source: &[u8], range: std::ops::Range<usize>) -> std::ops::Range<usize> {
    let mut end = range.end.min(source.len());
    while end > range.start && source[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    range.start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &[u8] = b"int a;\n  a += 1;\n\nend";

    fn index() -> LineIndex {
        LineIndex::new(FileId(0), SOURCE)
    }

    #[test]
    fn offsets_map_to_one_indexed_positions() {
        let idx = index();
        let loc = idx.location(0);
        assert_eq!((loc.line, loc.column), (1, 1));

        // "a" on line 2 after two spaces
        let loc = idx.location(9);
        assert_eq!((loc.line, loc.column), (2, 3));

        // empty line 3
        let loc = idx.location(17);
        assert_eq!((loc.line, loc.column), (3, 1));
    }

    #[test]
    fn line_column_round_trips_through_offset() {
        let idx = index();
        let loc = idx.location_at(2, 5).unwrap();
        assert_eq!(loc.offset, 11);
        assert_eq!(idx.location(loc.offset), loc);
    }

    #[test]
    fn location_at_rejects_positions_off_the_line() {
        let idx = index();
        assert!(idx.location_at(0, 1).is_none());
        assert!(idx.location_at(1, 0).is_none());
        assert!(idx.location_at(1, 9).is_none());
        assert!(idx.location_at(9, 1).is_none());
        // just past the last character of a line is the newline position
        assert!(idx.location_at(1, 7).is_some());
    }

    #[test]
    fn offsets_past_end_clamp() {
        let idx = index();
        assert_eq!(idx.location(1_000).offset, idx.len());
    }

    #[test]
    fn trailing_whitespace_is_trimmed() {
        let src = b"#define X 1\n\n";
        let trimmed = trim_trailing_whitespace(src, 0..src.len());
        assert_eq!(&src[trimmed], b"#define X 1");
    }

    #[test]
    fn trimming_never_crosses_start() {
        let src = b"   ";
        assert_eq!(trim_trailing_whitespace(src, 1..3), 1..1);
    }
}
