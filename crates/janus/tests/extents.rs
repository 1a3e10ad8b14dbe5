//! Integration tests for extent invariants.
//!
//! The containment property is checked on the fixtures and on generated
//! programs assembled from statement fragments.

use std::fs;
use std::path::{Path, PathBuf};

use janus::{Cursor, CursorKind, JanusConfig, Workspace};
use proptest::prelude::*;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Every child lies inside its parent and siblings start in source order.
fn assert_well_nested(cursor: &Cursor) {
    let mut previous_start = None;
    for child in cursor.children() {
        assert!(
            cursor.extent().contains_extent(&child.extent()),
            "{child:?} escapes {cursor:?}"
        );
        if let Some(start) = previous_start {
            assert!(start <= child.extent().start, "{child:?} out of order");
        }
        previous_start = Some(child.extent().start);
        assert_well_nested(&child);
    }
}

#[test]
fn fixture_extents_are_well_nested() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    for name in ["comprehensive_test.cpp", "extent_test.cpp", "monitor_test.cpp"] {
        let unit = workspace.load(&fixture(name)).unwrap();
        assert_well_nested(&unit.snapshot().unwrap().root());
    }
}

#[test]
fn root_covers_the_whole_file() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    let path = fixture("long_short.cpp");
    let unit = workspace.load(&path).unwrap();
    let root = unit.snapshot().unwrap().root();
    let size = fs::metadata(&path).unwrap().len();

    assert_eq!(root.extent().start.offset, 0);
    assert_eq!(u64::from(root.extent().end.offset), size);
}

#[test]
fn constructor_extent_includes_member_initializers() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    let unit = workspace.load(&fixture("extent_test.cpp")).unwrap();
    let snapshot = unit.snapshot().unwrap();

    let ctor = snapshot
        .find_by_kind(CursorKind::Constructor)
        .find(|c| c.spelling() == "ComplexClass")
        .expect("ComplexClass constructor");
    assert_eq!(ctor.extent().start.line, 16);
    assert_eq!(ctor.extent().end.line, 19);
    assert!(
        ctor.descendants()
            .any(|c| c.kind() == CursorKind::MemberRef && c.spelling() == "name")
    );
}

#[test]
fn spelling_extent_sits_inside_the_declaration() {
    let workspace = Workspace::new(JanusConfig::default()).unwrap();
    let unit = workspace.load(&fixture("extent_test.cpp")).unwrap();
    let snapshot = unit.snapshot().unwrap();

    let method = snapshot
        .functions()
        .into_iter()
        .find(|c| c.spelling() == "processData")
        .expect("processData method");
    assert_eq!(method.kind(), CursorKind::CxxMethod);
    assert!(method.extent().contains_extent(&method.spelling_extent()));
    assert_eq!(
        snapshot.tree.text(&method.spelling_extent()),
        "processData"
    );
}

// === Generated programs ===

const STATEMENTS: &[&str] = &[
    "int a = 1;",
    "a += 2;",
    "if (a > 0) { a = 0; } else { a = 1; }",
    "for (int i = 0; i < 3; ++i) { a *= i; }",
    "while (a) { --a; }",
    "do { a++; } while (a < 4);",
    "switch (a) { case 1: break; default: a = 2; }",
    ";",
    "int* p = new int(3); delete p;",
    "a = a > 1 ? a : 1;",
    "try { throw 1; } catch (int e) { a = e; }",
    "{ int b = a, c = b; }",
    "char s[] = \"x\";",
    "return;",
];

const TOP_LEVEL: &[&str] = &[
    "int g = 0;",
    "struct S { int x; void m() {} };",
    "enum E { A, B = 2 };",
    "namespace n { int v; }",
    "template<typename T> T id(T t) { return t; }",
    "#define LIMIT 4",
    "class C { public: C() {} ~C() {} };",
];

fn program() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(prop::sample::select(TOP_LEVEL), 0..4),
        prop::collection::vec(prop::sample::select(STATEMENTS), 0..8),
    )
        .prop_map(|(items, body)| {
            let mut source = items.join("\n");
            source.push_str("\nvoid f() {\n    int a = 0;\n");
            for stmt in body {
                source.push_str("    ");
                source.push_str(stmt);
                source.push('\n');
            }
            source.push_str("}\n");
            source
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn generated_programs_are_well_nested(source in program()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gen.cpp");
        fs::write(&path, &source).unwrap();

        let workspace = Workspace::new(JanusConfig::default()).unwrap();
        let unit = workspace.load(&path).unwrap();
        let first = unit.snapshot().unwrap();
        prop_assert!(first.tree.containment_violations().is_empty());
        assert_well_nested(&first.root());

        // unchanged content re-parses to the same structure
        workspace.load(&path).unwrap();
        let second = unit.snapshot().unwrap();
        prop_assert_eq!(first.structure(), second.structure());
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("noise.cpp");
        fs::write(&path, &bytes).unwrap();

        let workspace = Workspace::new(JanusConfig::default()).unwrap();
        if let Ok(unit) = workspace.load(&path) {
            let snapshot = unit.snapshot().unwrap();
            prop_assert!(snapshot.tree.containment_violations().is_empty());
        }
    }
}
