//! `janus at` command implementation.

use std::path::Path;

use colored::Colorize;
use janus::query;

use super::Options;
use super::display::cursor_line;

/// Run the at command.
pub fn run(
    options: &Options,
    file: &Path,
    line: u32,
    column: u32,
    json: bool,
) -> Result<(), janus::Error> {
    let workspace = options.workspace()?;
    let unit = workspace.load(file)?;

    let Some(cursor) = query::find_at_line_column(&unit, line, column)? else {
        println!(
            "{} {}:{line}:{column}",
            "No cursor at".yellow(),
            unit.path().display()
        );
        return Ok(());
    };
    let details = cursor.details();

    if json {
        let rendered = serde_json::to_string_pretty(&details)
            .map_err(|e| janus::Error::Config(format!("JSON error: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("{}", details.display_name.cyan().bold());
    println!("  {}: {}", "Location".white().bold(), details.location);
    println!(
        "  {}: {} - {}",
        "Extent".white().bold(),
        details.extent.start,
        details.extent.end
    );
    if let Some(op) = details.operator {
        println!("  {}: {op}", "Operator".white().bold());
    }
    println!(
        "  {}: {}",
        "Definition".white().bold(),
        if details.is_definition { "yes" } else { "no" }
    );
    println!("  {}: {}", "Children".white().bold(), details.children);
    println!("  {}: {}", "Tokens".white().bold(), details.tokens.join(" "));

    let ancestors: Vec<_> = cursor.ancestors().collect();
    if !ancestors.is_empty() {
        println!();
        println!("{}:", "Enclosed by".white().bold());
        for ancestor in &ancestors {
            println!("  {} {}", "•".dimmed(), cursor_line(ancestor));
        }
    }
    Ok(())
}
