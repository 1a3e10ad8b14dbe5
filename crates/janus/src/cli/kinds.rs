//! `janus kinds` command implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use colored::Colorize;
use janus::CursorKind;

use super::Options;
use super::display::print_load_errors;

/// Run the kinds command.
pub fn run(options: &Options, files: &[PathBuf]) -> Result<(), janus::Error> {
    let workspace = options.workspace()?;
    let stats = workspace.load_all(files);

    let mut totals: BTreeMap<CursorKind, usize> = BTreeMap::new();
    for unit in workspace.units() {
        let snapshot = unit.snapshot()?;
        for (kind, count) in snapshot.tree.kind_counts() {
            *totals.entry(kind).or_default() += count;
        }
    }

    println!(
        "{} {} files, {} cursors",
        "Loaded".green().bold(),
        stats.files_loaded,
        stats.cursors
    );
    println!("{}: {:.2?}", "Duration".dimmed(), stats.duration);
    println!();

    // Sort by count descending, then by kind for deterministic output
    let mut sorted: Vec<_> = totals.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let width = sorted
        .iter()
        .map(|(kind, _)| kind.as_str().len())
        .max()
        .unwrap_or(0);
    for (kind, count) in sorted {
        let name = format!("{:width$}", kind.as_str());
        if kind.is_unclassified() {
            println!("  {}  {}", name.yellow(), count.to_string().yellow());
        } else {
            println!("  {}  {}", name.dimmed(), count.to_string().green());
        }
    }

    if stats.classification_gaps > 0 {
        println!();
        println!(
            "{}: {} unclassified cursors",
            "Gaps".yellow(),
            stats.classification_gaps
        );
    }
    print_load_errors(&stats.errors);
    Ok(())
}
