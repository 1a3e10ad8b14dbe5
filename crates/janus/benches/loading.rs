//! Benchmarks for Janus loading and queries.
//!
//! These benchmarks measure:
//! - Single-file load (read + parse + classify) at several file sizes
//! - Parallel batch loading
//! - Position and kind queries on a loaded snapshot

// Benchmark code - performance of the benchmark setup is not critical
#![allow(missing_docs)]
#![allow(clippy::format_push_string)]
#![allow(clippy::cast_possible_truncation)]

use std::fs;
use std::hint::black_box;
use std::path::PathBuf;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use janus::{CursorKind, JanusConfig, Workspace};
use tempfile::TempDir;

/// Generate a C++ file with classes, free functions and control flow.
fn generate_cpp_file(num_classes: usize, num_functions: usize) -> String {
    let mut code = String::from("#include <vector>\n#include <string>\n\n");

    for i in 0..num_classes {
        code.push_str(&format!(
            "class Widget{i} {{\n\
             public:\n    \
                 Widget{i}(int v) : value(v) {{}}\n    \
                 ~Widget{i}() {{}}\n    \
                 int scaled(int factor) const {{ return value * factor; }}\n\
             private:\n    \
                 int value;\n\
             }};\n\n"
        ));
    }

    for i in 0..num_functions {
        code.push_str(&format!(
            "int compute{i}(int n) {{\n    \
                 int total = 0;\n    \
                 for (int k = 0; k < n; ++k) {{\n        \
                     switch (k % 3) {{\n            \
                         case 0: total += k; break;\n            \
                         default: total -= 1;\n        \
                     }}\n    \
                 }}\n    \
                 do {{ total /= 2; }} while (total > 100);\n    \
                 return total > 0 ? total : -total;\n\
             }}\n\n"
        ));
    }
    code
}

fn write_files(count: usize, classes: usize, functions: usize) -> (TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let paths = (0..count)
        .map(|i| {
            let path = dir.path().join(format!("unit{i}.cpp"));
            fs::write(&path, generate_cpp_file(classes, functions)).expect("failed to write file");
            path
        })
        .collect();
    (dir, paths)
}

fn bench_single_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_load");

    for (classes, functions) in [(2, 5), (10, 25), (40, 100)] {
        let (_dir, paths) = write_files(1, classes, functions);
        let size = fs::metadata(&paths[0]).expect("file exists").len();
        group.throughput(Throughput::Bytes(size));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{classes}c_{functions}f")),
            &paths[0],
            |b, path| {
                let workspace = Workspace::new(JanusConfig::default()).expect("valid config");
                b.iter(|| black_box(workspace.load(path).expect("load")));
            },
        );
    }
    group.finish();
}

fn bench_batch_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_load");
    group.sample_size(20);

    for count in [4, 16, 64] {
        let (_dir, paths) = write_files(count, 5, 10);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &paths, |b, paths| {
            b.iter(|| {
                let workspace = Workspace::new(JanusConfig::default()).expect("valid config");
                black_box(workspace.load_all(paths))
            });
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let (_dir, paths) = write_files(1, 40, 100);
    let workspace = Workspace::new(JanusConfig::default()).expect("valid config");
    let unit = workspace.load(&paths[0]).expect("load");
    let snapshot = unit.snapshot().expect("live unit");
    let lines = snapshot.tree.line_index().line_count() as u32;

    c.bench_function("find_at/every_line", |b| {
        b.iter(|| {
            for line in 1..=lines {
                black_box(snapshot.find_at(line, 5));
            }
        });
    });

    c.bench_function("find_by_kind/do_stmt", |b| {
        b.iter(|| black_box(snapshot.find_by_kind(CursorKind::DoStmt).count()));
    });
}

criterion_group!(benches, bench_single_load, bench_batch_load, bench_queries);
criterion_main!(benches);
