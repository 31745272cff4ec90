//! Preflight - ask the engine to plan the statement without running it

use std::time::Duration;

use crate::db::{self, DbPool, Watchdog};
use crate::types::GuardError;

/// Compile the statement on a read-only connection.
///
/// SQLite plans a statement at prepare time, so a successful prepare proves
/// the query is acceptable to the engine without touching any rows. The
/// engine's own message is surfaced verbatim on failure; this stage catches
/// every semantic error the lighter static stages cannot (unresolved
/// columns, type mismatches, syntax the structural parser was lenient
/// about). The prepared statement must additionally report itself read-only
/// to the engine.
pub async fn run(pool: &DbPool, sql: &str, timeout: Duration) -> Result<(), GuardError> {
    let conn = pool.get().lock().await;
    let _watchdog = Watchdog::arm(&conn, timeout);

    let stmt = conn.prepare(sql).map_err(|e| {
        if db::interrupted(&e) {
            GuardError::Timeout(timeout.as_secs())
        } else {
            GuardError::Preflight(e.to_string())
        }
    })?;

    if !stmt.readonly() {
        return Err(GuardError::Preflight(
            "statement is not read-only".to_string(),
        ));
    }

    Ok(())
}
