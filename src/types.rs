//! Error taxonomy and serializable tool responses

use serde::Serialize;
use thiserror::Error;

use crate::catalog::TableSchema;
use crate::guard::Verdict;

// ============================================================================
// Errors
// ============================================================================

/// Pipeline stage that produced a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Structural,
    Keyword,
    Schema,
    Preflight,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Structural => "structural",
            Stage::Keyword => "keyword",
            Stage::Schema => "schema",
            Stage::Preflight => "preflight",
        };
        f.write_str(name)
    }
}

/// Everything that can go wrong between receiving SQL text and returning rows.
///
/// Guardrail-stage errors are folded into an invalid verdict at the pipeline
/// boundary and never escape it; only `CatalogUnavailable` at startup is
/// fatal to the process.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("{0}")]
    Structural(String),

    #[error("query contains forbidden keyword: {0}")]
    Keyword(String),

    #[error("unable to tokenize query: {0}")]
    Tokenize(String),

    #[error("table does not exist: {0}")]
    UnknownTable(String),

    #[error("column does not exist: {0}")]
    UnknownColumn(String),

    #[error("engine rejected query: {0}")]
    Preflight(String),

    #[error("query timed out after {0}s")]
    Timeout(u64),

    #[error("query rejected at {stage} stage: {reason}")]
    Rejected { stage: Stage, reason: String },

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("schema catalog unavailable: {0}")]
    CatalogUnavailable(String),
}

impl GuardError {
    /// Stage attribution for verdict reporting. `Execution` and
    /// `CatalogUnavailable` happen outside the pipeline and carry none.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            GuardError::Structural(_) => Some(Stage::Structural),
            GuardError::Keyword(_) | GuardError::Tokenize(_) => Some(Stage::Keyword),
            GuardError::UnknownTable(_) | GuardError::UnknownColumn(_) => Some(Stage::Schema),
            GuardError::Preflight(_) | GuardError::Timeout(_) => Some(Stage::Preflight),
            GuardError::Rejected { stage, .. } => Some(*stage),
            GuardError::Execution(_) | GuardError::CatalogUnavailable(_) => None,
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Rendering of a verdict over the tool boundary.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failing_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_sql: Option<String>,
    /// Always present, empty when there is nothing to say.
    pub warnings: Vec<String>,
}

impl From<Verdict> for ValidationReport {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Valid { sql, warnings } => Self {
                valid: true,
                reason: None,
                failing_stage: None,
                normalized_sql: Some(sql),
                warnings,
            },
            Verdict::Invalid { stage, reason } => Self {
                valid: false,
                reason: Some(reason),
                failing_stage: Some(stage),
                normalized_sql: None,
                warnings: Vec::new(),
            },
        }
    }
}

/// Full table/column listing returned by the get_db_schema tool.
#[derive(Debug, Serialize)]
pub struct SchemaReport {
    pub tables: Vec<TableSchema>,
}

/// Health probe response.
#[derive(Debug, Serialize)]
pub struct PingReport {
    pub status: String,
    pub version: String,
    pub database: String,
    pub timestamp: String,
}
