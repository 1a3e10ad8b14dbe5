//! `janus find` command implementation.

use std::path::Path;

use colored::Colorize;
use janus::{CursorKind, query};

use super::Options;
use super::display::cursor_line;

/// Run the find command.
pub fn run(options: &Options, file: &Path, kind: &str, limit: usize) -> Result<(), janus::Error> {
    let kind: CursorKind = kind
        .parse()
        .map_err(|e: janus::UnknownKind| janus::Error::Config(e.to_string()))?;

    let workspace = options.workspace()?;
    let unit = workspace.load(file)?;
    let matches: Vec<_> = query::find_by_kind(&unit, kind)?.collect();

    if matches.is_empty() {
        println!("No {} cursors in {}", kind.as_str().cyan(), unit.path().display());
        return Ok(());
    }

    println!(
        "Found {} {} cursors:",
        matches.len().to_string().green(),
        kind.as_str().cyan()
    );
    println!();
    for cursor in matches.iter().take(limit) {
        println!("  {}", cursor_line(cursor));
        let text = cursor.text();
        if let Some(first) = text.lines().next() {
            println!("    {}", first.trim().dimmed());
        }
    }
    if matches.len() > limit {
        println!();
        println!("  ... and {} more (use --limit to show more)", matches.len() - limit);
    }
    Ok(())
}
