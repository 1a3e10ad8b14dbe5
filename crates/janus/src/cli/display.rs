//! Common display utilities for CLI commands.

use colored::Colorize;
use janus::{Cursor, Diagnostic, LoadError, Severity};

const MAX_DISPLAY_ITEMS: usize = 10;

/// One-line rendering: `KIND spelling  [start-end]`.
pub fn cursor_line(cursor: &Cursor) -> String {
    let extent = cursor.extent();
    let mut line = cursor.kind().as_str().cyan().to_string();
    if !cursor.spelling().is_empty() {
        line.push(' ');
        line.push_str(&cursor.spelling().white().bold().to_string());
    }
    if let Some(op) = cursor.operator() {
        line.push_str(&format!(" {}", format!("'{op}'").yellow()));
    }
    line.push_str(&format!(
        "  {}",
        format!("[{}-{}]", extent.start, extent.end).dimmed()
    ));
    line
}

/// Print diagnostics, truncated after `MAX_DISPLAY_ITEMS`.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!();
    println!("{} ({}):", "Diagnostics".yellow().bold(), diagnostics.len());
    for diag in diagnostics.iter().take(MAX_DISPLAY_ITEMS) {
        let bullet = match diag.severity {
            Severity::Error => "•".red(),
            Severity::Warning => "•".yellow(),
        };
        println!("  {bullet} {diag}");
    }
    if diagnostics.len() > MAX_DISPLAY_ITEMS {
        println!(
            "  ... and {} more",
            diagnostics.len() - MAX_DISPLAY_ITEMS
        );
    }
}

/// Print per-file load failures, truncated after `MAX_DISPLAY_ITEMS`.
pub fn print_load_errors(errors: &[LoadError]) {
    if errors.is_empty() {
        return;
    }
    println!();
    println!("{} ({}):", "Errors".red().bold(), errors.len());
    for err in errors.iter().take(MAX_DISPLAY_ITEMS) {
        println!("  {} {}: {}", "•".red(), err.path.display(), err.message);
    }
    if errors.len() > MAX_DISPLAY_ITEMS {
        println!("  ... and {} more", errors.len() - MAX_DISPLAY_ITEMS);
    }
}
