//! Unit-level queries.
//!
//! Each query captures one snapshot of the unit and answers entirely from it,
//! so a concurrent re-parse of the same file is never observed half-way.
//! Queries against a released unit fail with `Error::UnitReleased`.

use crate::error::Result;
use crate::kind::CursorKind;
use crate::tree::{ByKind, Cursor};
use crate::types::SourceLocation;
use crate::unit::TranslationUnit;

/// Innermost cursor whose full extent contains `location`.
///
/// # Errors
///
/// Returns `Error::UnitReleased` if the unit has been released.
pub fn find_at_position(unit: &TranslationUnit, location: SourceLocation) -> Result<Option<Cursor>> {
    Ok(unit.snapshot()?.find_at_position(location))
}

/// Innermost cursor at a 1-indexed line and byte column.
///
/// # Errors
///
/// Returns `Error::UnitReleased` if the unit has been released.
pub fn find_at_line_column(unit: &TranslationUnit, line: u32, column: u32) -> Result<Option<Cursor>> {
    Ok(unit.snapshot()?.find_at(line, column))
}

/// Lazy, restartable sequence of every cursor of `kind` in source order.
///
/// The sequence holds the generation that was current when it was created.
///
/// # Errors
///
/// Returns `Error::UnitReleased` if the unit has been released.
pub fn find_by_kind(unit: &TranslationUnit, kind: CursorKind) -> Result<ByKind> {
    Ok(unit.snapshot()?.find_by_kind(kind))
}

/// The label a `goto` jumps to.
///
/// Labels are function-scoped, so the match is the `LabelStmt` with the same
/// spelling whose enclosing function is the goto's. Returns `None` for
/// non-goto cursors and unresolved labels.
#[must_use]
pub fn resolve_goto(goto: &Cursor) -> Option<Cursor> {
    if goto.kind() != CursorKind::GotoStmt {
        return None;
    }
    let scope = enclosing_function(goto).unwrap_or_else(|| goto.tree().root());
    scope.descendants().find(|candidate| {
        candidate.kind() == CursorKind::LabelStmt
            && candidate.spelling() == goto.spelling()
            && enclosing_function(candidate).as_ref() == enclosing_function(goto).as_ref()
    })
}

/// Every `goto` that jumps to `label`.
#[must_use]
pub fn gotos_to(label: &Cursor) -> Vec<Cursor> {
    if label.kind() != CursorKind::LabelStmt {
        return Vec::new();
    }
    let scope = enclosing_function(label).unwrap_or_else(|| label.tree().root());
    scope
        .descendants()
        .filter(|c| c.kind() == CursorKind::GotoStmt)
        .filter(|c| resolve_goto(c).as_ref() == Some(label))
        .collect()
}

fn enclosing_function(cursor: &Cursor) -> Option<Cursor> {
    cursor
        .ancestors()
        .find(|a| a.kind().is_function() || a.kind() == CursorKind::LambdaExpr)
}
