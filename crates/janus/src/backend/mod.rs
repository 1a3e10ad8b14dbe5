//! Parse backends.
//!
//! A backend turns one source buffer plus compile arguments into a
//! [`CursorTree`] and a list of diagnostics. The production backend is
//! [`TreeSitterBackend`]; the trait exists so loads can be driven by other
//! frontends (and by instrumented backends in tests).
//!
//! ## Design
//!
//! The tree-sitter backend works in two passes over the native tree:
//!
//! 1. A lexical scan ([`tree_sitter_utils::scan`]) records every leaf token
//!    and every `ERROR` / `MISSING` node (these become diagnostics).
//! 2. The classifier in [`cpp`] walks the native tree once and emits cursors.
//!
//! The scan stays a separate pass. It runs before the usability check, so a
//! file with no usable tree still reports located syntax errors, and it sees
//! the leaves under nodes the classifier collapses into a single cursor.
//!
//! tree-sitter does not preprocess, so compile arguments are validated rather
//! than applied: problems with them surface as warnings.

mod cpp;
mod tree_sitter_utils;

use std::path::Path;
use tracing::debug;
use tree_sitter::Node;

use crate::tree::{CursorTree, TreeBuilder};
use crate::types::{Diagnostic, FileId};

/// Language standards accepted by `-std=`.
const KNOWN_STANDARDS: &[&str] = &[
    "c++98", "c++03", "c++11", "c++14", "c++17", "c++20", "c++23", "c++26", "c++0x", "c++1y",
    "c++1z", "c++2a", "c++2b", "c++2c", "gnu++98", "gnu++03", "gnu++11", "gnu++14", "gnu++17",
    "gnu++20", "gnu++23", "gnu++26", "gnu++2a", "gnu++2b", "gnu++2c", "c89", "c90", "c99",
    "c11", "c17", "c18", "c23", "gnu89", "gnu99", "gnu11", "gnu17", "gnu23",
];

/// Input to one parse.
#[derive(Debug, Clone, Copy)]
pub struct ParseRequest<'a> {
    /// Path of the file being parsed (used for spelling the root cursor)
    pub path: &'a Path,
    /// Interned identity of the file
    pub file: FileId,
    /// File contents
    pub source: &'a [u8],
    /// Clang-style compile arguments
    pub args: &'a [String],
}

/// Result of one parse.
#[derive(Debug)]
pub struct ParseOutput {
    /// The cursor tree, or `None` when the backend produced no usable tree
    pub tree: Option<CursorTree>,
    /// Diagnostics in the order they were produced
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    /// A parse that produced no usable tree.
    #[must_use]
    pub fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            tree: None,
            diagnostics,
        }
    }
}

/// A parser frontend that produces cursor trees.
///
/// Implementations must be callable from several worker threads at once.
pub trait ParseBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Parse one buffer. Never panics on malformed input: failures are
    /// reported as a `None` tree plus diagnostics.
    fn parse(&self, request: &ParseRequest<'_>) -> ParseOutput;
}

/// C++ backend built on tree-sitter-cpp.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterBackend;

impl ParseBackend for TreeSitterBackend {
    fn name(&self) -> &str {
        "tree-sitter-cpp"
    }

    fn parse(&self, request: &ParseRequest<'_>) -> ParseOutput {
        let (mut diagnostics, suppress_warnings) = validate_args(request.args);

        // tree_sitter::Parser is not Sync; one per parse keeps the backend shareable
        let mut parser = tree_sitter::Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_cpp::LANGUAGE.into()) {
            diagnostics.push(Diagnostic::error(format!("cannot load C++ grammar: {e}"), None));
            return ParseOutput::failed(diagnostics);
        }
        let Some(native) = parser.parse(request.source, None) else {
            diagnostics.push(Diagnostic::error("parser returned no tree", None));
            return ParseOutput::failed(diagnostics);
        };

        let mut builder = TreeBuilder::new(request.path, request.file, request.source);
        let scan = tree_sitter_utils::scan(&native, request.source);
        for error in &scan.syntax_errors {
            let location = builder.line_index().location(offset_u32(error.offset));
            diagnostics.push(Diagnostic::error(error.message.clone(), Some(location)));
        }
        if suppress_warnings {
            diagnostics.retain(|d| d.severity.is_error());
        }

        let root = native.root_node();
        if !is_usable(root) {
            debug!(
                path = %request.path.display(),
                errors = scan.syntax_errors.len(),
                "No usable syntax tree"
            );
            return ParseOutput::failed(diagnostics);
        }

        for token in scan.tokens {
            builder.push_token(token);
        }
        let builder = cpp::Classifier::new(builder, request.source).run(root);
        let tree = builder.finish(request.source.to_vec());

        debug!(
            path = %request.path.display(),
            cursors = tree.len(),
            gaps = tree.classification_gaps(),
            diagnostics = diagnostics.len(),
            "Classified translation unit"
        );
        ParseOutput {
            tree: Some(tree),
            diagnostics,
        }
    }
}

#[allow(clippy::cast_possible_truncation)] // Offsets fit in u32, see extent.rs
fn offset_u32(offset: usize) -> u32 {
    offset as u32
}

/// Whether a native tree is worth classifying.
///
/// A tree is unusable when the root itself is an error, or when a non-empty
/// file has nothing but errors at the top level.
fn is_usable(root: Node<'_>) -> bool {
    if root.is_error() {
        return false;
    }
    let items = tree_sitter_utils::named_children(root);
    items.is_empty() || items.iter().any(|item| !item.is_error())
}

/// Check compile arguments, returning warnings and whether `-w` was given.
fn validate_args(args: &[String]) -> (Vec<Diagnostic>, bool) {
    let mut diagnostics = Vec::new();
    let mut suppress = false;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "-w" {
            suppress = true;
        } else if let Some(dir) = arg.strip_prefix("-I") {
            let dir = if dir.is_empty() {
                iter.next().map_or("", String::as_str)
            } else {
                dir
            };
            if dir.is_empty() {
                diagnostics.push(Diagnostic::warning("argument to '-I' is missing", None));
            } else if !Path::new(dir).is_dir() {
                diagnostics.push(Diagnostic::warning(
                    format!("include path does not exist: {dir}"),
                    None,
                ));
            }
        } else if let Some(define) = arg.strip_prefix("-D") {
            let name = define.split('=').next().unwrap_or_default();
            if name.is_empty() {
                diagnostics.push(Diagnostic::warning("macro name missing after '-D'", None));
            }
        } else if let Some(standard) = arg.strip_prefix("-std=") {
            if !KNOWN_STANDARDS.contains(&standard) {
                diagnostics.push(Diagnostic::warning(
                    format!("invalid value '{standard}' in '-std={standard}'"),
                    None,
                ));
            }
        }
    }

    (diagnostics, suppress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use tempfile::TempDir;

    fn parse(code: &str, args: &[String]) -> ParseOutput {
        TreeSitterBackend.parse(&ParseRequest {
            path: Path::new("test.cpp"),
            file: FileId(0),
            source: code.as_bytes(),
            args,
        })
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn clean_source_has_no_diagnostics() {
        let output = parse("int main() { return 0; }", &[]);
        assert!(output.tree.is_some());
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    }

    #[test]
    fn empty_file_is_usable() {
        let output = parse("", &[]);
        let tree = output.tree.expect("empty file should parse");
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn garbage_has_no_usable_tree() {
        let output = parse("}}} ))) ]]]", &[]);
        assert!(output.tree.is_none());
        assert!(output.diagnostics.iter().any(|d| d.severity.is_error()));
    }

    #[test]
    fn unusable_tree_still_reports_where_it_broke() {
        let output = parse("\n\n}}} ))) ]]]", &[]);
        assert!(output.tree.is_none());
        let lines: Vec<_> = output
            .diagnostics
            .iter()
            .filter(|d| d.severity.is_error())
            .filter_map(|d| d.location.map(|l| l.line))
            .collect();
        assert!(lines.contains(&3), "{lines:?}");
    }

    #[test]
    fn syntax_errors_are_located_but_tree_survives() {
        let output = parse("int ok = 1;\nint main() { int x = ; }\n", &[]);
        assert!(output.tree.is_some());
        let error = output
            .diagnostics
            .iter()
            .find(|d| d.severity == Severity::Error)
            .expect("syntax error diagnostic");
        assert_eq!(error.location.map(|l| l.line), Some(2));
    }

    #[test]
    fn missing_include_dir_is_a_warning() {
        let output = parse("int x;", &args(&["-I/definitely/not/here"]));
        assert!(output.tree.is_some());
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].severity, Severity::Warning);
        assert!(output.diagnostics[0].message.contains("/definitely/not/here"));
    }

    #[test]
    fn existing_include_dir_is_accepted() {
        let dir = TempDir::new().unwrap();
        let flag = format!("-I{}", dir.path().display());
        let output = parse("int x;", &[flag]);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn unknown_standard_is_a_warning() {
        let output = parse("int x;", &args(&["-std=c++17"]));
        assert!(output.diagnostics.is_empty());
        let output = parse("int x;", &args(&["-std=c++42"]));
        assert_eq!(output.diagnostics.len(), 1);
    }

    #[test]
    fn dash_w_suppresses_warnings_only() {
        let output = parse("int main() { int x = ; }", &args(&["-std=bogus", "-w"]));
        assert!(output.diagnostics.iter().all(|d| d.severity.is_error()));
        assert!(!output.diagnostics.is_empty());
    }

    #[test]
    fn separate_include_argument_is_consumed() {
        let output = parse("int x;", &args(&["-I", "/definitely/not/here", "-DDEBUG"]));
        assert_eq!(output.diagnostics.len(), 1);
    }
}
