//! `janus dump` command implementation.

use std::path::Path;

use colored::Colorize;
use janus::{Cursor, CursorKind};
use serde::Serialize;

use super::Options;
use super::display::{cursor_line, print_diagnostics};

#[derive(Serialize)]
struct DumpNode {
    kind: CursorKind,
    spelling: String,
    start: String,
    end: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<DumpNode>,
}

/// Run the dump command.
pub fn run(
    options: &Options,
    file: &Path,
    depth: Option<usize>,
    json: bool,
) -> Result<(), janus::Error> {
    let workspace = options.workspace()?;
    let unit = workspace.load(file)?;
    let snapshot = unit.snapshot()?;
    let max_depth = depth.unwrap_or(usize::MAX);

    if json {
        let tree = to_node(&snapshot.root(), 0, max_depth);
        let rendered = serde_json::to_string_pretty(&tree)
            .map_err(|e| janus::Error::Config(format!("JSON error: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "{} {} ({} cursors, generation {})",
        "Cursors".cyan().bold(),
        unit.path().display(),
        snapshot.tree.len(),
        snapshot.generation
    );
    print_tree(&snapshot.root(), 0, max_depth);

    let gaps = snapshot.tree.classification_gaps();
    if gaps > 0 {
        println!();
        println!("{}: {gaps} unclassified cursors", "Gaps".yellow());
    }
    print_diagnostics(&snapshot.diagnostics);
    Ok(())
}

fn print_tree(cursor: &Cursor, depth: usize, max_depth: usize) {
    println!("{}{}", "  ".repeat(depth), cursor_line(cursor));
    if depth == max_depth {
        if cursor.child_count() > 0 {
            println!(
                "{}{}",
                "  ".repeat(depth + 1),
                format!("... {} children", cursor.child_count()).dimmed()
            );
        }
        return;
    }
    for child in cursor.children() {
        print_tree(&child, depth + 1, max_depth);
    }
}

fn to_node(cursor: &Cursor, depth: usize, max_depth: usize) -> DumpNode {
    let extent = cursor.extent();
    let children = if depth < max_depth {
        cursor
            .children()
            .map(|c| to_node(&c, depth + 1, max_depth))
            .collect()
    } else {
        Vec::new()
    };
    DumpNode {
        kind: cursor.kind(),
        spelling: cursor.spelling().to_string(),
        start: extent.start.to_string(),
        end: extent.end.to_string(),
        children,
    }
}
