//! Tool handlers
//!
//! Each handler shapes a guardrail-core result into a `CallToolResult`.
//! Rejections become invalid-request errors so the calling LLM sees the
//! reason and can self-correct; engine failures become internal errors.

use chrono::Local;
use rmcp::model::{CallToolResult, Content};
use rmcp::ErrorData as McpError;
use serde::Serialize;

use crate::catalog::SchemaSnapshot;
use crate::db::DbPool;
use crate::executor::QueryExecutor;
use crate::guard::Guardrail;
use crate::types::{GuardError, PingReport, SchemaReport, ValidationReport};

/// Pretty-printed JSON tool response.
fn json_content<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn guard_error_to_mcp(error: GuardError) -> McpError {
    match &error {
        GuardError::Rejected { .. } => McpError::invalid_request(error.to_string(), None),
        _ => McpError::internal_error(error.to_string(), None),
    }
}

/// Full table/column listing from the schema snapshot.
pub fn get_db_schema(snapshot: &SchemaSnapshot) -> Result<CallToolResult, McpError> {
    tracing::info!("fetching database schema");
    json_content(&SchemaReport {
        tables: snapshot.tables().to_vec(),
    })
}

/// Run the guardrail pipeline and report the verdict.
pub async fn validate_query(guard: &Guardrail, sql: &str) -> Result<CallToolResult, McpError> {
    tracing::info!(sql, "validating SQL query");
    let verdict = guard.validate(sql).await;
    json_content(&ValidationReport::from(verdict))
}

/// Validate and execute, returning the materialized rows.
pub async fn execute_sql(executor: &QueryExecutor, sql: &str) -> Result<CallToolResult, McpError> {
    tracing::info!(sql, "executing SQL query");
    match executor.execute(sql).await {
        Ok(rows) => json_content(&rows),
        Err(error) => {
            tracing::warn!(error = %error, "query not executed");
            Err(guard_error_to_mcp(error))
        }
    }
}

/// Health probe: database reachability plus server version and local time.
pub async fn ping(pool: &DbPool) -> Result<CallToolResult, McpError> {
    let database = {
        let conn = pool.get().lock().await;
        match conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)) {
            Ok(_) => "healthy".to_string(),
            Err(error) => format!("unhealthy: {error}"),
        }
    };
    let status = if database == "healthy" { "ok" } else { "degraded" };

    json_content(&PingReport {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        timestamp: Local::now().format("%d-%m-%Y %H:%M:%S %Z").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use crate::types::Stage;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_db_schema_lists_tables() {
        let (_dir, path) = test_support::northwind_db();
        let snapshot = test_support::snapshot(&path);

        let result = get_db_schema(&snapshot).unwrap();
        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(result.content.len(), 1);
    }

    #[tokio::test]
    async fn test_validate_query_reports_verdict() {
        let (_dir, path) = test_support::northwind_db();
        let guard = Guardrail::new(
            Arc::new(test_support::snapshot(&path)),
            test_support::pool(&path),
            Duration::from_secs(5),
        );

        let result = validate_query(&guard, "SELECT OrderID FROM Orders")
            .await
            .unwrap();
        assert!(!result.is_error.unwrap_or(false));
    }

    #[tokio::test]
    async fn test_execute_sql_rejection_is_invalid_request() {
        let (_dir, path) = test_support::northwind_db();
        let pool = test_support::pool(&path);
        let guard = Guardrail::new(
            Arc::new(test_support::snapshot(&path)),
            pool.clone(),
            Duration::from_secs(5),
        );
        let executor = QueryExecutor::new(guard, pool, Duration::from_secs(5), None);

        let err = execute_sql(&executor, "DELETE FROM Orders").await.unwrap_err();
        assert!(err.message.contains("not a read query"));
    }

    #[test]
    fn test_rejected_maps_to_invalid_request() {
        let err = guard_error_to_mcp(GuardError::Rejected {
            stage: Stage::Keyword,
            reason: "query contains forbidden keyword: DROP".to_string(),
        });
        assert!(err.message.contains("DROP"));

        let err = guard_error_to_mcp(GuardError::Execution("disk I/O error".to_string()));
        assert!(err.message.contains("disk I/O error"));
    }

    #[tokio::test]
    async fn test_ping_healthy() {
        let (_dir, path) = test_support::northwind_db();
        let pool = test_support::pool(&path);

        let result = ping(&pool).await.unwrap();
        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(result.content.len(), 1);
    }
}
