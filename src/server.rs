//! SQL guard MCP server
//!
//! Wires the guardrail pipeline, catalog and executor behind the rmcp tool
//! router. Handler bodies live in the handlers module.

use std::sync::Arc;
use std::time::Duration;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError,
};

use crate::catalog::SchemaSnapshot;
use crate::config::GuardConfig;
use crate::db::{self, DbPool};
use crate::executor::QueryExecutor;
use crate::guard::Guardrail;
use crate::handlers;
use crate::params::{ExecuteParams, ValidateParams};
use crate::types::GuardError;

/// The SQL guard MCP server
#[derive(Clone)]
pub struct SqlGuardMcpServer {
    snapshot: Arc<SchemaSnapshot>,
    pool: DbPool,
    guard: Guardrail,
    executor: QueryExecutor,
    tool_router: ToolRouter<Self>,
}

impl SqlGuardMcpServer {
    /// Create a new server, loading config from standard locations.
    ///
    /// An unreachable database is fatal here: the service never starts with
    /// a partial or missing catalog.
    pub fn new() -> Result<Self, GuardError> {
        let config = GuardConfig::load().unwrap_or_else(|e| {
            tracing::warn!("failed to load config: {e}; using defaults");
            GuardConfig::default()
        });
        Self::with_config(config)
    }

    /// Create a new server with explicit config
    pub fn with_config(config: GuardConfig) -> Result<Self, GuardError> {
        let timeout = Duration::from_secs(config.limits.timeout_secs);

        let bootstrap = db::open_read_only(&config.database.path, timeout)?;
        let snapshot = Arc::new(SchemaSnapshot::load(&bootstrap)?);
        drop(bootstrap);

        let pool = DbPool::open(&config.database.path, config.database.pool_size, timeout)?;
        let guard = Guardrail::new(Arc::clone(&snapshot), pool.clone(), timeout);
        let executor = QueryExecutor::new(guard.clone(), pool.clone(), timeout, config.limits.max_rows);

        tracing::info!(
            database = %config.database.path.display(),
            tables = snapshot.tables().len(),
            pool_size = pool.size(),
            "schema catalog loaded"
        );

        Ok(Self {
            snapshot,
            pool,
            guard,
            executor,
            tool_router: Self::tool_router(),
        })
    }
}

#[tool_router]
impl SqlGuardMcpServer {
    /// Return the database schema
    #[tool(
        description = "Get the full database schema: every table with its columns, types, constraints and primary keys. Call this before writing queries."
    )]
    async fn get_db_schema(&self) -> Result<CallToolResult, McpError> {
        handlers::get_db_schema(&self.snapshot)
    }

    /// Validate a query without executing it
    #[tool(
        description = "Validate a SQL query without executing it. Returns {valid, reason?, failing_stage?, warnings}. Only single-statement read-only SELECT queries referencing existing tables and columns are valid."
    )]
    async fn validate_query(
        &self,
        Parameters(params): Parameters<ValidateParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::validate_query(&self.guard, &params.sql).await
    }

    /// Execute a validated query
    #[tool(
        description = "Execute a read-only SELECT query and return column names and rows as JSON. The query is validated first and rejected with a reason if it fails any guardrail."
    )]
    async fn execute_sql(
        &self,
        Parameters(params): Parameters<ExecuteParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::execute_sql(&self.executor, &params.sql).await
    }

    /// Health check
    #[tool(description = "Health probe: server version and database reachability.")]
    async fn ping(&self) -> Result<CallToolResult, McpError> {
        handlers::ping(&self.pool).await
    }
}

#[tool_handler]
impl rmcp::ServerHandler for SqlGuardMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Read-only SQL gateway. Use get_db_schema to discover tables, \
                 validate_query to check a query before running it, and \
                 execute_sql to run it. Only single-statement SELECT queries \
                 are accepted; rejections explain which guardrail failed and why."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
