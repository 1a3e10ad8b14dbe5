//! Integration tests for position and kind queries against the fixtures.

use std::path::{Path, PathBuf};

use janus::{CursorKind, JanusConfig, Operator, Workspace, query};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load(workspace: &Workspace, name: &str) -> std::sync::Arc<janus::TranslationUnit> {
    workspace.load(&fixture(name)).expect("fixture should load")
}

// === find_at_position ===

#[test]
fn increment_operand_is_a_reference_to_quotient() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    let unit = load(&workspace, "long_division.cpp");

    let cursor = query::find_at_line_column(&unit, 26, 11)
        .unwrap()
        .expect("a cursor covers 26:11");
    assert_eq!(cursor.kind(), CursorKind::DeclRefExpr);
    assert_eq!(cursor.spelling(), "quotient");

    let parent = cursor.parent().unwrap();
    assert_eq!(parent.kind(), CursorKind::UnaryOperator);
    assert_eq!(parent.operator(), Some(Operator::PreInc));
}

#[test]
fn position_past_the_end_finds_nothing() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    let unit = load(&workspace, "long_division.cpp");
    assert!(query::find_at_line_column(&unit, 500, 1).unwrap().is_none());
    assert!(query::find_at_line_column(&unit, 26, 400).unwrap().is_none());
}

#[test]
fn innermost_cursor_is_contained_by_all_its_ancestors() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    let unit = load(&workspace, "extent_test.cpp");
    let snapshot = unit.snapshot().unwrap();

    for line in 1..=40 {
        let Some(position) = snapshot.tree.line_index().location_at(line, 5) else {
            continue;
        };
        let Some(cursor) = snapshot.find_at_position(position) else {
            continue;
        };
        assert!(cursor.extent().contains(position));
        for ancestor in cursor.ancestors() {
            assert!(ancestor.extent().contains_extent(&cursor.extent()));
        }
        assert!(
            cursor.children().all(|child| !child.extent().contains(position)),
            "a child of {cursor:?} also covers {line}:5"
        );
    }
}

// === find_by_kind ===

#[test]
fn long_short_has_no_do_while() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    let unit = load(&workspace, "long_short.cpp");
    assert_eq!(query::find_by_kind(&unit, CursorKind::DoStmt).unwrap().count(), 0);
}

#[test]
fn comprehensive_has_one_do_while_spanning_its_body_and_condition() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    let unit = load(&workspace, "comprehensive_test.cpp");

    let found: Vec<_> = query::find_by_kind(&unit, CursorKind::DoStmt)
        .unwrap()
        .collect();
    assert_eq!(found.len(), 1);

    let do_stmt = &found[0];
    let extent = do_stmt.extent();
    assert_eq!(extent.start.line, 172);
    assert_eq!(extent.end.line, 181);
    assert!(do_stmt.text().trim_end().ends_with("while (counter < 5);"));

    let kinds: Vec<_> = do_stmt.children().map(|c| c.kind()).collect();
    assert_eq!(kinds.first(), Some(&CursorKind::CompoundStmt));
    assert_eq!(kinds.last(), Some(&CursorKind::BinaryOperator));
}

#[test]
fn find_by_kind_is_restartable_and_in_source_order() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    let unit = load(&workspace, "comprehensive_test.cpp");

    let mut calls = query::find_by_kind(&unit, CursorKind::CallExpr).unwrap();
    let first_pass: Vec<_> = calls.by_ref().collect();
    assert!(!first_pass.is_empty());
    assert!(
        first_pass
            .windows(2)
            .all(|w| w[0].extent().start <= w[1].extent().start)
    );

    calls.restart();
    let second_pass: Vec<_> = calls.collect();
    assert_eq!(first_pass, second_pass);
}

#[test]
fn by_kind_keeps_its_generation_after_reload() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    let unit = load(&workspace, "comprehensive_test.cpp");
    let stale = query::find_by_kind(&unit, CursorKind::SwitchStmt).unwrap();

    load(&workspace, "comprehensive_test.cpp");
    assert_eq!(unit.generation(), 2);
    assert_eq!(stale.count(), 1);
}

// === goto / label ===

#[test]
fn fixture_goto_resolves_to_its_label() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    let unit = load(&workspace, "comprehensive_test.cpp");
    let goto = query::find_by_kind(&unit, CursorKind::GotoStmt)
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(goto.spelling(), "error_handler");

    let label = query::resolve_goto(&goto).expect("label in the same function");
    assert_eq!(label.kind(), CursorKind::LabelStmt);
    assert_eq!(label.extent().start.line, 192);
    assert_eq!(query::gotos_to(&label), vec![goto]);
}
