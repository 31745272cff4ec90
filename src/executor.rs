//! Query executor - validate, then run against the read-only handle

use std::time::Duration;

use serde::Serialize;

use crate::db::{self, DbPool, Watchdog};
use crate::guard::{Guardrail, Verdict};
use crate::types::GuardError;

/// Materialized result set with column names from the engine's descriptor.
#[derive(Debug, Serialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
    pub truncated: bool,
}

/// Executes validated queries against pooled read-only connections.
#[derive(Clone)]
pub struct QueryExecutor {
    guard: Guardrail,
    pool: DbPool,
    timeout: Duration,
    max_rows: Option<usize>,
}

impl QueryExecutor {
    pub fn new(
        guard: Guardrail,
        pool: DbPool,
        timeout: Duration,
        max_rows: Option<usize>,
    ) -> Self {
        Self {
            guard,
            pool,
            timeout,
            max_rows,
        }
    }

    /// Run the full guardrail pipeline, then execute the normalized text.
    ///
    /// Validation is re-run on every call; a verdict obtained out-of-band
    /// by the caller is never trusted. Engine failures during the fetch are
    /// per-call errors and leave the service healthy.
    pub async fn execute(&self, sql: &str) -> Result<RowSet, GuardError> {
        let sql = match self.guard.validate(sql).await {
            Verdict::Valid { sql, .. } => sql,
            Verdict::Invalid { stage, reason } => {
                return Err(GuardError::Rejected { stage, reason })
            }
        };

        let conn = self.pool.get().lock().await;
        let _watchdog = Watchdog::arm(&conn, self.timeout);

        let mut stmt = conn.prepare(&sql).map_err(|e| self.engine_error(e))?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut rows = stmt.query([]).map_err(|e| self.engine_error(e))?;
        let mut out: Vec<Vec<serde_json::Value>> = Vec::new();
        let mut truncated = false;
        while let Some(row) = rows.next().map_err(|e| self.engine_error(e))? {
            if self.max_rows.is_some_and(|cap| out.len() >= cap) {
                truncated = true;
                break;
            }
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value: rusqlite::types::Value =
                    row.get(i).map_err(|e| self.engine_error(e))?;
                values.push(value_to_json(value));
            }
            out.push(values);
        }

        tracing::debug!(rows = out.len(), truncated, "query executed");

        Ok(RowSet {
            columns,
            row_count: out.len(),
            rows: out,
            truncated,
        })
    }

    fn engine_error(&self, error: rusqlite::Error) -> GuardError {
        if db::interrupted(&error) {
            GuardError::Timeout(self.timeout.as_secs())
        } else {
            GuardError::Execution(error.to_string())
        }
    }
}

fn value_to_json(value: rusqlite::types::Value) -> serde_json::Value {
    match value {
        rusqlite::types::Value::Null => serde_json::Value::Null,
        rusqlite::types::Value::Integer(i) => serde_json::json!(i),
        rusqlite::types::Value::Real(f) => serde_json::json!(f),
        rusqlite::types::Value::Text(s) => serde_json::Value::String(s),
        rusqlite::types::Value::Blob(b) => {
            serde_json::Value::String(format!("<blob {} bytes>", b.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use crate::types::Stage;
    use std::sync::Arc;

    fn executor(path: &std::path::Path, max_rows: Option<usize>) -> QueryExecutor {
        let snapshot = Arc::new(test_support::snapshot(path));
        let pool = test_support::pool(path);
        let timeout = Duration::from_secs(5);
        let guard = Guardrail::new(snapshot, pool.clone(), timeout);
        QueryExecutor::new(guard, pool, timeout, max_rows)
    }

    #[tokio::test]
    async fn test_executes_validated_select() {
        let (_dir, path) = test_support::northwind_db();
        let executor = executor(&path, None);

        let result = executor
            .execute("SELECT OrderID FROM Orders WHERE ShipCountry = 'France'")
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["OrderID"]);
        assert_eq!(result.row_count, 2);
        assert!(!result.truncated);
        assert_eq!(result.rows[0][0], serde_json::json!(10249));
    }

    #[tokio::test]
    async fn test_rejection_prevents_execution() {
        let (_dir, path) = test_support::northwind_db();
        let executor = executor(&path, None);

        let err = executor.execute("DROP TABLE Customers").await.unwrap_err();
        assert!(matches!(
            err,
            GuardError::Rejected {
                stage: Stage::Structural,
                ..
            }
        ));

        // The table must still be there.
        let result = executor
            .execute("SELECT COUNT(*) AS n FROM Customers")
            .await
            .unwrap();
        assert_eq!(result.rows[0][0], serde_json::json!(2));
    }

    #[tokio::test]
    async fn test_unknown_table_rejected_before_execution() {
        let (_dir, path) = test_support::northwind_db();
        let executor = executor(&path, None);

        let err = executor.execute("SELECT * FROM Cstomers").await.unwrap_err();
        match err {
            GuardError::Rejected { stage, reason } => {
                assert_eq!(stage, Stage::Schema);
                assert!(reason.contains("Cstomers"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_row_cap_truncates() {
        let (_dir, path) = test_support::northwind_db();
        let executor = executor(&path, Some(2));

        let result = executor.execute("SELECT OrderID FROM Orders").await.unwrap();
        assert_eq!(result.row_count, 2);
        assert!(result.truncated);
    }

    // Multi-thread runtime: the row loop blocks its worker while the
    // watchdog timer fires on another.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_runaway_query_surfaces_timeout() {
        let (_dir, path) = test_support::northwind_db();
        let snapshot = Arc::new(test_support::snapshot(&path));
        let pool = test_support::pool(&path);
        let timeout = Duration::from_millis(200);
        let guard = Guardrail::new(snapshot, pool.clone(), timeout);
        let executor = QueryExecutor::new(guard, pool, timeout, None);

        let err = executor
            .execute(
                "WITH RECURSIVE counter(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM counter) \
                 SELECT COUNT(*) FROM counter",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::Timeout(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_null_and_text_values_mapped() {
        let (_dir, path) = test_support::northwind_db();
        let executor = executor(&path, None);

        let result = executor
            .execute("SELECT CompanyName, NULL AS missing FROM Customers WHERE CustomerID = 'ALFKI'")
            .await
            .unwrap();
        assert_eq!(
            result.rows[0][0],
            serde_json::Value::String("Alfreds Futterkiste".to_string())
        );
        assert_eq!(result.rows[0][1], serde_json::Value::Null);
    }
}
