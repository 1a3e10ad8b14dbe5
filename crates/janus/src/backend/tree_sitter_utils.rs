//! Shared tree-sitter helpers: node text, field-aware child iteration and the
//! lexical scan that records tokens and syntax errors.

use std::borrow::Cow;
use std::ops::Range;
use tree_sitter::{Node, Tree};

/// Native nodes treated as a single token even though the grammar splits them.
const ATOMIC_TOKENS: &[&str] = &[
    "string_literal",
    "raw_string_literal",
    "char_literal",
    "number_literal",
    "system_lib_string",
    "preproc_arg",
];

/// Longest source excerpt quoted in a syntax-error message.
const ERROR_EXCERPT_LEN: usize = 24;

/// Text of a node; invalid UTF-8 is replaced rather than rejected.
pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> Cow<'s, str> {
    String::from_utf8_lossy(&source[node.byte_range()])
}

/// Named children paired with the field they occupy, in source order.
///
/// Comments are dropped.
pub(crate) fn named_children_with_fields<'t>(node: Node<'t>) -> Vec<(Option<&'static str>, Node<'t>)> {
    let mut cursor = node.walk();
    let mut children = Vec::with_capacity(node.named_child_count());
    if !cursor.goto_first_child() {
        return children;
    }
    loop {
        let child = cursor.node();
        if child.is_named() && child.kind() != "comment" {
            children.push((cursor.field_name(), child));
        }
        if !cursor.goto_next_sibling() {
            break;
        }
    }
    children
}

/// Named, non-comment children in source order.
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    named_children_with_fields(node)
        .into_iter()
        .map(|(_, child)| child)
        .collect()
}

/// Whether `node` has a direct anonymous child spelled `token`.
pub(crate) fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token)
}

/// Anonymous direct child spelled `token`, if any.
pub(crate) fn token_child<'t>(node: Node<'t>, token: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|child| !child.is_named() && child.kind() == token)
}

/// A syntax problem found by the lexical scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

/// Leaf tokens and syntax errors of a native tree.
#[derive(Debug, Default)]
pub(crate) struct LexicalScan {
    pub tokens: Vec<Range<usize>>,
    pub syntax_errors: Vec<SyntaxError>,
}

/// Walk the native tree once, recording leaf tokens in source order and every
/// `ERROR` / `MISSING` node.
pub(crate) fn scan(tree: &Tree, source: &[u8]) -> LexicalScan {
    let mut scan = LexicalScan::default();
    let mut cursor = tree.walk();

    'walk: loop {
        let node = cursor.node();
        let mut descend = true;

        if node.is_missing() {
            scan.syntax_errors.push(SyntaxError {
                offset: node.start_byte(),
                message: format!("missing `{}`", node.kind()),
            });
            descend = false;
        } else if node.is_error() {
            scan.syntax_errors.push(SyntaxError {
                offset: node.start_byte(),
                message: format!("unexpected `{}`", excerpt(node, source)),
            });
        } else if node.kind() == "comment" {
            descend = false;
        } else if node.child_count() == 0 || ATOMIC_TOKENS.contains(&node.kind()) {
            if !node.byte_range().is_empty() {
                scan.tokens.push(node.byte_range());
            }
            descend = false;
        }

        if descend && cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    scan
}

fn excerpt(node: Node<'_>, source: &[u8]) -> String {
    let text = node_text(node, source);
    let first_line = text.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() > ERROR_EXCERPT_LEN {
        let cut: String = first_line.chars().take(ERROR_EXCERPT_LEN).collect();
        format!("{cut}...")
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(code: &str) -> Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .expect("Failed to load C++ grammar");
        parser.parse(code, None).expect("Failed to parse")
    }

    #[test]
    fn literals_are_single_tokens() {
        let code = r#"const char* s = "a b c";"#;
        let tree = parse(code);
        let scan = scan(&tree, code.as_bytes());
        let texts: Vec<&str> = scan.tokens.iter().map(|r| &code[r.clone()]).collect();
        assert!(texts.contains(&"\"a b c\""), "{texts:?}");
        assert_eq!(texts.last(), Some(&";"));
        assert!(scan.syntax_errors.is_empty());
    }

    #[test]
    fn comments_are_not_tokens() {
        let code = "int x; // trailing\n";
        let tree = parse(code);
        let scan = scan(&tree, code.as_bytes());
        let texts: Vec<&str> = scan.tokens.iter().map(|r| &code[r.clone()]).collect();
        assert_eq!(texts, vec!["int", "x", ";"]);
    }

    #[test]
    fn tokens_are_sorted() {
        let code = "int main() { return a + b * 2; }";
        let tree = parse(code);
        let scan = scan(&tree, code.as_bytes());
        assert!(scan.tokens.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[test]
    fn broken_code_reports_syntax_errors() {
        let code = "int main() { int x = ; }";
        let tree = parse(code);
        let scan = scan(&tree, code.as_bytes());
        assert!(!scan.syntax_errors.is_empty());
    }

    #[test]
    fn field_names_are_reported() {
        let code = "int add(int a, int b) { return a + b; }";
        let tree = parse(code);
        let function = tree.root_node().named_child(0).unwrap();
        let fields: Vec<_> = named_children_with_fields(function)
            .into_iter()
            .map(|(field, _)| field)
            .collect();
        assert_eq!(fields, vec![Some("type"), Some("declarator"), Some("body")]);
    }
}
