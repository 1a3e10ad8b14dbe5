//! The cursor tree: an immutable, arena-backed tree of classified nodes.
//!
//! ## Ownership
//!
//! A [`CursorTree`] owns every node in a flat arena laid out in preorder.
//! Parents own their children through index lists; the parent link on a child
//! is a plain [`CursorId`], so the tree has no ownership cycles. Because the
//! arena is in preorder, "all cursors of kind K in source order" is a linear
//! scan and every subtree is a contiguous index range.
//!
//! [`Cursor`] is the handle callers hold: an `Arc` of the tree plus an index.
//! Holding a cursor keeps its whole generation alive, independent of later
//! re-parses of the same file.

use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::extent::LineIndex;
use crate::kind::{CursorKind, Operator};
use crate::types::{FileId, SourceExtent, SourceLocation};

/// Number of tokens shown by [`Cursor::details`] before truncating.
pub const DETAIL_TOKEN_LIMIT: usize = 10;

/// Index of a cursor within its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CursorId(pub u32);

impl CursorId {
    /// The root cursor of every tree.
    pub const ROOT: CursorId = CursorId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct CursorNode {
    kind: CursorKind,
    extent: SourceExtent,
    spelling_extent: SourceExtent,
    spelling: String,
    operator: Option<Operator>,
    is_definition: bool,
    is_scoped: bool,
    parent: Option<CursorId>,
    /// Position among the parent's children
    child_index: u32,
    children: Vec<CursorId>,
    /// One past the last arena index of this node's subtree
    subtree_end: u32,
}

/// One immutable parse result: classified cursors over a source snapshot.
#[derive(Debug)]
pub struct CursorTree {
    path: PathBuf,
    file: FileId,
    source: Vec<u8>,
    line_index: LineIndex,
    nodes: Vec<CursorNode>,
    /// Byte ranges of the leaf tokens, sorted
    tokens: Vec<Range<u32>>,
    gaps: usize,
}

impl CursorTree {
    /// Path of the parsed file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File identity shared by every location in this tree.
    #[must_use]
    pub fn file(&self) -> FileId {
        self.file
    }

    /// The source buffer this tree was built from.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Line index for the source buffer.
    #[must_use]
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Number of cursors, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of `Unclassified` cursors in the tree.
    #[must_use]
    pub fn classification_gaps(&self) -> usize {
        self.gaps
    }

    /// The `TranslationUnit` root cursor.
    #[must_use]
    pub fn root(self: &Arc<Self>) -> Cursor {
        Cursor {
            tree: Arc::clone(self),
            id: CursorId::ROOT,
        }
    }

    /// Cursor for an arena index, if it exists.
    #[must_use]
    pub fn cursor(self: &Arc<Self>, id: CursorId) -> Option<Cursor> {
        (id.index() < self.nodes.len()).then(|| Cursor {
            tree: Arc::clone(self),
            id,
        })
    }

    /// All cursors in source preorder, root first.
    #[must_use]
    pub fn cursors(self: &Arc<Self>) -> Preorder {
        Preorder {
            tree: Arc::clone(self),
            next: 0,
            end: self.nodes.len(),
        }
    }

    /// Lazy, restartable sequence of every cursor of `kind`, in source preorder.
    #[must_use]
    pub fn by_kind(self: &Arc<Self>, kind: CursorKind) -> ByKind {
        ByKind {
            tree: Arc::clone(self),
            kind,
            next: 0,
        }
    }

    /// The most deeply nested cursor whose full extent contains `location`.
    ///
    /// When a parent and its child share an identical extent, the child wins.
    /// Returns `None` for locations in another file or outside the root extent.
    #[must_use]
    pub fn cursor_at(self: &Arc<Self>, location: SourceLocation) -> Option<Cursor> {
        let root = &self.nodes[CursorId::ROOT.index()];
        if location.file != self.file || !root.extent.contains(location) {
            return None;
        }

        let mut current = CursorId::ROOT;
        'descend: loop {
            for &child in &self.nodes[current.index()].children {
                if self.nodes[child.index()].extent.contains(location) {
                    current = child;
                    continue 'descend;
                }
            }
            break;
        }
        self.cursor(current)
    }

    /// Child-index path from the root to `id`; the root's path is empty.
    #[must_use]
    pub fn node_path(&self, id: CursorId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(node) = self.nodes.get(current.index()) {
            let Some(parent) = node.parent else { break };
            path.push(node.child_index as usize);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Follow a child-index path from the root.
    #[must_use]
    pub fn find_by_path(self: &Arc<Self>, path: &[usize]) -> Option<Cursor> {
        let mut current = CursorId::ROOT;
        for &step in path {
            current = *self.nodes[current.index()].children.get(step)?;
        }
        self.cursor(current)
    }

    /// Histogram of cursor kinds.
    #[must_use]
    pub fn kind_counts(&self) -> BTreeMap<CursorKind, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            *counts.entry(node.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Preorder `(kind, extent)` sequence, used for structural equality across generations.
    #[must_use]
    pub fn structure(&self) -> Vec<(CursorKind, SourceExtent)> {
        self.nodes.iter().map(|n| (n.kind, n.extent)).collect()
    }

    /// Every `(parent, child)` pair whose extents break containment.
    ///
    /// Empty for every tree the classifier produces.
    #[must_use]
    pub fn containment_violations(&self) -> Vec<(CursorId, CursorId)> {
        let mut violations = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                if !node.extent.contains_extent(&self.nodes[child.index()].extent) {
                    violations.push((CursorId(index as u32), child));
                }
            }
        }
        violations
    }

    /// Source text covered by an extent.
    #[must_use]
    pub fn text(&self, extent: &SourceExtent) -> Cow<'_, str> {
        let range = extent.byte_range();
        let end = range.end.min(self.source.len());
        let start = range.start.min(end);
        String::from_utf8_lossy(&self.source[start..end])
    }

    /// Tokens lying entirely inside `extent`, in source order.
    #[must_use]
    pub fn tokens_in(&self, extent: &SourceExtent) -> Vec<Cow<'_, str>> {
        let (start, end) = (extent.start.offset, extent.end.offset);
        let first = self.tokens.partition_point(|t| t.start < start);
        self.tokens[first..]
            .iter()
            .take_while(|t| t.end <= end)
            .map(|t| String::from_utf8_lossy(&self.source[t.start as usize..t.end as usize]))
            .collect()
    }

    fn node(&self, id: CursorId) -> &CursorNode {
        &self.nodes[id.index()]
    }
}

// ============================================================================
// Cursor handle
// ============================================================================

/// A classified node, held through a shared handle on its tree.
#[derive(Clone)]
pub struct Cursor {
    tree: Arc<CursorTree>,
    id: CursorId,
}

impl Cursor {
    /// Arena index of this cursor.
    #[must_use]
    pub fn id(&self) -> CursorId {
        self.id
    }

    /// Tree (and therefore generation) this cursor belongs to.
    #[must_use]
    pub fn tree(&self) -> &Arc<CursorTree> {
        &self.tree
    }

    /// Kind of this cursor.
    #[must_use]
    pub fn kind(&self) -> CursorKind {
        self.node().kind
    }

    /// Full extent, covering keywords, braces and terminators.
    #[must_use]
    pub fn extent(&self) -> SourceExtent {
        self.node().extent
    }

    /// Extent of the identifying token; equals the full extent when there is none.
    #[must_use]
    pub fn spelling_extent(&self) -> SourceExtent {
        self.node().spelling_extent
    }

    /// Start of the spelling extent.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        self.node().spelling_extent.start
    }

    /// Identifier text, or an empty string for constructs without a name.
    #[must_use]
    pub fn spelling(&self) -> &str {
        &self.node().spelling
    }

    /// Operator discriminant for operator cursors.
    #[must_use]
    pub fn operator(&self) -> Option<Operator> {
        self.node().operator
    }

    /// Whether this cursor is a definition (has a body) rather than a declaration.
    #[must_use]
    pub fn is_definition(&self) -> bool {
        self.node().is_definition
    }

    /// Whether this is a scoped enumeration (`enum class`).
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.node().is_scoped
    }

    /// Parent cursor; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Cursor> {
        self.node().parent.map(|id| self.with_id(id))
    }

    /// Children in source order.
    pub fn children(&self) -> impl Iterator<Item = Cursor> + '_ {
        self.node().children.iter().map(|&id| self.with_id(id))
    }

    /// Number of direct children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.node().children.len()
    }

    /// Child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<Cursor> {
        self.node().children.get(index).map(|&id| self.with_id(id))
    }

    /// Strict descendants in source preorder.
    #[must_use]
    pub fn descendants(&self) -> Preorder {
        Preorder {
            tree: Arc::clone(&self.tree),
            next: self.id.index() + 1,
            end: self.node().subtree_end as usize,
        }
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Cursor> + '_ {
        std::iter::successors(self.parent(), Cursor::parent)
    }

    /// Whether `other` lies in this cursor's subtree (a cursor contains itself).
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Cursor) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree)
            && self.id <= other.id
            && other.id.0 < self.node().subtree_end
    }

    /// Source text of the full extent.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        self.tree.text(&self.node().extent)
    }

    /// Tokens of the full extent.
    #[must_use]
    pub fn tokens(&self) -> Vec<Cow<'_, str>> {
        self.tree.tokens_in(&self.node().extent)
    }

    /// Child-index path from the root.
    #[must_use]
    pub fn path(&self) -> Vec<usize> {
        self.tree.node_path(self.id)
    }

    /// `KIND: spelling`, or just `KIND` when there is no spelling.
    #[must_use]
    pub fn display_name(&self) -> String {
        let node = self.node();
        if node.spelling.is_empty() {
            node.kind.as_str().to_string()
        } else {
            format!("{}: {}", node.kind.as_str(), node.spelling)
        }
    }

    /// Collected details for display.
    #[must_use]
    pub fn details(&self) -> CursorDetails {
        let node = self.node();
        let tokens = self.tokens();
        let mut preview: Vec<String> = tokens
            .iter()
            .take(DETAIL_TOKEN_LIMIT)
            .map(ToString::to_string)
            .collect();
        if tokens.len() > DETAIL_TOKEN_LIMIT {
            preview.push("...".to_string());
        }

        CursorDetails {
            kind: node.kind,
            spelling: node.spelling.clone(),
            display_name: self.display_name(),
            location: format!(
                "{}:{}:{}",
                self.tree.path.display(),
                node.spelling_extent.start.line,
                node.spelling_extent.start.column
            ),
            extent: node.extent,
            spelling_extent: node.spelling_extent,
            operator: node.operator,
            is_definition: node.is_definition,
            children: node.children.len(),
            tokens: preview,
        }
    }

    fn node(&self) -> &CursorNode {
        self.tree.node(self.id)
    }

    fn with_id(&self, id: CursorId) -> Cursor {
        Cursor {
            tree: Arc::clone(&self.tree),
            id,
        }
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }
}

impl Eq for Cursor {}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("kind", &self.kind())
            .field("spelling", &self.spelling())
            .field("extent", &self.extent())
            .finish()
    }
}

/// Everything the inspector shows about one cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CursorDetails {
    /// Cursor kind
    pub kind: CursorKind,
    /// Identifier text (may be empty)
    pub spelling: String,
    /// `KIND: spelling` or `KIND`
    pub display_name: String,
    /// `file:line:column` of the spelling location
    pub location: String,
    /// Full extent
    pub extent: SourceExtent,
    /// Spelling extent
    pub spelling_extent: SourceExtent,
    /// Operator discriminant, if any
    pub operator: Option<Operator>,
    /// Whether the cursor is a definition
    pub is_definition: bool,
    /// Number of direct children
    pub children: usize,
    /// First tokens of the cursor's text, with a trailing `...` when truncated
    pub tokens: Vec<String>,
}

// ============================================================================
// Iterators
// ============================================================================

/// Preorder walk over a contiguous arena range.
#[derive(Clone)]
pub struct Preorder {
    tree: Arc<CursorTree>,
    next: usize,
    end: usize,
}

impl Iterator for Preorder {
    type Item = Cursor;

    fn next(&mut self) -> Option<Cursor> {
        if self.next >= self.end {
            return None;
        }
        let id = CursorId(self.next as u32);
        self.next += 1;
        Some(Cursor {
            tree: Arc::clone(&self.tree),
            id,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Preorder {}

/// Cursors of one kind in source preorder.
///
/// Bound to a single tree, so it never observes another generation. Clone it
/// (or call [`ByKind::restart`]) to walk the sequence again.
#[derive(Clone)]
pub struct ByKind {
    tree: Arc<CursorTree>,
    kind: CursorKind,
    next: usize,
}

impl ByKind {
    /// Rewind to the first match.
    pub fn restart(&mut self) {
        self.next = 0;
    }

    /// Kind being matched.
    #[must_use]
    pub fn kind(&self) -> CursorKind {
        self.kind
    }
}

impl Iterator for ByKind {
    type Item = Cursor;

    fn next(&mut self) -> Option<Cursor> {
        while self.next < self.tree.nodes.len() {
            let index = self.next;
            self.next += 1;
            if self.tree.nodes[index].kind == self.kind {
                return Some(Cursor {
                    tree: Arc::clone(&self.tree),
                    id: CursorId(index as u32),
                });
            }
        }
        None
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Incremental, single-pass construction of a [`CursorTree`].
///
/// Cursors are opened in source order and closed in reverse, which lays the
/// arena out in preorder.
#[derive(Debug)]
pub(crate) struct TreeBuilder {
    path: PathBuf,
    line_index: LineIndex,
    nodes: Vec<CursorNode>,
    stack: Vec<CursorId>,
    tokens: Vec<Range<u32>>,
    gaps: usize,
}

#[allow(clippy::cast_possible_truncation)] // Arena sizes and offsets fit in u32
impl TreeBuilder {
    /// Start a tree whose root spans the whole buffer.
    pub(crate) fn new(path: &Path, file: FileId, source: &[u8]) -> Self {
        let line_index = LineIndex::new(file, source);
        let mut builder = Self {
            path: path.to_path_buf(),
            line_index,
            nodes: Vec::new(),
            stack: Vec::new(),
            tokens: Vec::new(),
            gaps: 0,
        };
        let extent = builder.line_index.extent(0..source.len());
        let root = builder.open(CursorKind::TranslationUnit, extent);
        builder.set_spelling(root, path.display().to_string(), extent);
        builder
    }

    pub(crate) fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Open a cursor as the last child of the innermost open cursor.
    pub(crate) fn open(&mut self, kind: CursorKind, extent: SourceExtent) -> CursorId {
        let id = CursorId(self.nodes.len() as u32);
        let parent = self.stack.last().copied();
        let child_index = match parent {
            Some(p) => {
                let siblings = &mut self.nodes[p.index()].children;
                siblings.push(id);
                siblings.len() as u32 - 1
            }
            None => 0,
        };
        if kind.is_unclassified() {
            self.gaps += 1;
        }
        self.nodes.push(CursorNode {
            kind,
            extent,
            spelling_extent: extent,
            spelling: String::new(),
            operator: None,
            is_definition: false,
            is_scoped: false,
            parent,
            child_index,
            children: Vec::new(),
            subtree_end: id.0 + 1,
        });
        self.stack.push(id);
        id
    }

    /// Close the innermost open cursor.
    pub(crate) fn close(&mut self) {
        if let Some(id) = self.stack.pop() {
            self.nodes[id.index()].subtree_end = self.nodes.len() as u32;
        }
    }

    /// Open and immediately close a childless cursor.
    pub(crate) fn leaf(&mut self, kind: CursorKind, extent: SourceExtent) -> CursorId {
        let id = self.open(kind, extent);
        self.close();
        id
    }

    pub(crate) fn set_spelling(&mut self, id: CursorId, spelling: String, extent: SourceExtent) {
        let node = &mut self.nodes[id.index()];
        node.spelling = spelling;
        node.spelling_extent = extent;
    }

    pub(crate) fn set_operator(&mut self, id: CursorId, operator: Operator) {
        self.nodes[id.index()].operator = Some(operator);
    }

    pub(crate) fn mark_definition(&mut self, id: CursorId) {
        self.nodes[id.index()].is_definition = true;
    }

    pub(crate) fn mark_scoped(&mut self, id: CursorId) {
        self.nodes[id.index()].is_scoped = true;
    }

    /// Record a leaf token's byte range. Tokens must arrive in source order.
    pub(crate) fn push_token(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        self.tokens.push(range.start as u32..range.end as u32);
    }

    /// Close every open cursor and freeze the tree.
    pub(crate) fn finish(mut self, source: Vec<u8>) -> CursorTree {
        while !self.stack.is_empty() {
            self.close();
        }
        CursorTree {
            path: self.path,
            file: self.line_index.file(),
            source,
            line_index: self.line_index,
            nodes: self.nodes,
            tokens: self.tokens,
            gaps: self.gaps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &[u8] = b"int f() { return 1 + 2; }";

    /// Hand-built tree: TU > FunctionDecl > CompoundStmt > ReturnStmt > BinaryOperator > 2 literals
    fn sample_tree() -> Arc<CursorTree> {
        let mut b = TreeBuilder::new(Path::new("sample.cpp"), FileId(7), SOURCE);
        let li = b.line_index().clone();

        let f = b.open(CursorKind::FunctionDecl, li.extent(0..25));
        b.set_spelling(f, "f".to_string(), li.extent(4..5));
        b.mark_definition(f);
        b.open(CursorKind::CompoundStmt, li.extent(8..25));
        b.open(CursorKind::ReturnStmt, li.extent(10..23));
        let op = b.open(CursorKind::BinaryOperator, li.extent(17..22));
        b.set_operator(op, Operator::Add);
        b.leaf(CursorKind::IntegerLiteral, li.extent(17..18));
        b.leaf(CursorKind::IntegerLiteral, li.extent(21..22));

        for range in [0..3, 4..5, 5..6, 6..7, 8..9, 10..16, 17..18, 19..20, 21..22, 22..23, 24..25] {
            b.push_token(range);
        }
        Arc::new(b.finish(SOURCE.to_vec()))
    }

    #[test]
    fn arena_is_preorder_with_parent_links() {
        let tree = sample_tree();
        let kinds: Vec<_> = tree.cursors().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                CursorKind::TranslationUnit,
                CursorKind::FunctionDecl,
                CursorKind::CompoundStmt,
                CursorKind::ReturnStmt,
                CursorKind::BinaryOperator,
                CursorKind::IntegerLiteral,
                CursorKind::IntegerLiteral,
            ]
        );

        let literal = tree.by_kind(CursorKind::IntegerLiteral).next().unwrap();
        let parent = literal.parent().unwrap();
        assert_eq!(parent.kind(), CursorKind::BinaryOperator);
        assert_eq!(parent.operator(), Some(Operator::Add));
        assert_eq!(literal.ancestors().count(), 5);
    }

    #[test]
    fn cursor_at_returns_innermost() {
        let tree = sample_tree();
        let loc = tree.line_index().location(21);
        let found = tree.cursor_at(loc).unwrap();
        assert_eq!(found.kind(), CursorKind::IntegerLiteral);
        assert_eq!(found.text(), "2");

        // the `+` belongs to the operator, not a literal
        let loc = tree.line_index().location(19);
        assert_eq!(tree.cursor_at(loc).unwrap().kind(), CursorKind::BinaryOperator);
    }

    #[test]
    fn cursor_at_rejects_foreign_file() {
        let tree = sample_tree();
        let foreign = SourceLocation::new(FileId(8), 0, 1, 1);
        assert!(tree.cursor_at(foreign).is_none());
    }

    #[test]
    fn by_kind_is_restartable() {
        let tree = sample_tree();
        let mut literals = tree.by_kind(CursorKind::IntegerLiteral);
        assert_eq!(literals.by_ref().count(), 2);
        assert!(literals.next().is_none());
        literals.restart();
        assert_eq!(literals.count(), 2);
    }

    #[test]
    fn node_path_round_trips() {
        let tree = sample_tree();
        for cursor in tree.cursors() {
            let path = cursor.path();
            assert_eq!(tree.find_by_path(&path).unwrap(), cursor);
        }
        assert!(tree.root().path().is_empty());
        assert!(tree.find_by_path(&[0, 5]).is_none());
    }

    #[test]
    fn descendants_cover_exactly_the_subtree() {
        let tree = sample_tree();
        let ret = tree.by_kind(CursorKind::ReturnStmt).next().unwrap();
        let kinds: Vec<_> = ret.descendants().map(|c| c.kind()).collect();
        assert_eq!(kinds.len(), 3);
        for d in ret.descendants() {
            assert!(ret.is_ancestor_of(&d));
        }
        let func = tree.by_kind(CursorKind::FunctionDecl).next().unwrap();
        assert!(!ret.is_ancestor_of(&func));
    }

    #[test]
    fn details_truncate_tokens() {
        let tree = sample_tree();
        let func = tree.by_kind(CursorKind::FunctionDecl).next().unwrap();
        let details = func.details();
        assert_eq!(details.display_name, "FUNCTION_DECL: f");
        assert_eq!(details.location, "sample.cpp:1:5");
        assert!(details.is_definition);
        assert_eq!(details.tokens.len(), DETAIL_TOKEN_LIMIT + 1);
        assert_eq!(details.tokens.last().map(String::as_str), Some("..."));
    }

    #[test]
    fn kind_counts_and_containment() {
        let tree = sample_tree();
        let counts = tree.kind_counts();
        assert_eq!(counts[&CursorKind::IntegerLiteral], 2);
        assert!(tree.containment_violations().is_empty());
        assert_eq!(tree.classification_gaps(), 0);
    }
}
