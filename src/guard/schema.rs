//! Schema-aware validation against the catalog snapshot

use crate::catalog::SchemaSnapshot;
use crate::guard::structural::ParsedStatement;
use crate::types::GuardError;

/// Reject identifiers that don't exist in the schema.
///
/// Table names are checked unconditionally. Column references are checked
/// only when their qualifier resolves (directly or through a FROM/JOIN
/// alias) to a known table; unqualified references are left for the engine's
/// preflight pass, which performs real name binding.
pub fn check(parsed: &ParsedStatement, snapshot: &SchemaSnapshot) -> Result<(), GuardError> {
    for table in &parsed.tables {
        if !snapshot.table_exists(table) {
            return Err(GuardError::UnknownTable(table.clone()));
        }
    }

    for column in &parsed.columns {
        let Some(hint) = &column.table else { continue };
        let table = parsed
            .aliases
            .get(&hint.to_lowercase())
            .map(String::as_str)
            .unwrap_or(hint.as_str());
        if snapshot.table_exists(table) && !snapshot.column_exists(table, &column.column) {
            return Err(GuardError::UnknownColumn(format!(
                "{}.{}",
                table, column.column
            )));
        }
    }

    Ok(())
}
