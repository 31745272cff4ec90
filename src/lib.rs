//! Guarded SQL query gateway
//!
//! Validates untrusted SQL (typically written by an LLM agent) through a
//! four-stage guardrail pipeline and executes it against a read-only SQLite
//! database only when every stage passes:
//!
//! 1. **Structural** - exactly one statement, and it must be a SELECT
//! 2. **Keyword** - token-level denylist of write/DDL/engine-control keywords
//! 3. **Schema** - referenced tables and qualified columns must exist
//! 4. **Preflight** - the engine plans the statement on a read-only connection
//!
//! Rejections carry the failing stage and a human-readable reason so the
//! caller can self-correct and retry.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use sqlguard_mcp::SqlGuardMcpServer;
//!
//! let server = SqlGuardMcpServer::new()?;
//! // Serve via stdio or call the guardrail types directly
//! ```

pub mod catalog;
pub mod config;
pub mod db;
pub mod executor;
pub mod guard;
pub mod handlers;
pub mod params;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main server type
pub use server::SqlGuardMcpServer;

// Re-export the guardrail core for direct API usage
pub use catalog::SchemaSnapshot;
pub use executor::QueryExecutor;
pub use guard::{Guardrail, Verdict};
pub use types::{GuardError, Stage};
