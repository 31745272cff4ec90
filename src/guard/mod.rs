//! Guardrail pipeline - fixed-order, short-circuit validation of untrusted SQL
//!
//! Stage order is structural -> keyword -> schema -> preflight: the cheapest
//! and most decisive checks run first, and the engine round trip runs last,
//! only on input that already passed three static checks.

pub mod keywords;
pub mod preflight;
pub mod schema;
pub mod structural;

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::SchemaSnapshot;
use crate::db::DbPool;
use crate::types::{GuardError, Stage};

pub use structural::{ColumnRef, ParsedStatement};

/// Outcome of the guardrail pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The query may be executed. `sql` is the normalized text (comments
    /// stripped, whitespace canonical) and must be the text actually
    /// executed, so execution never diverges from what was validated.
    Valid { sql: String, warnings: Vec<String> },
    /// The query was rejected, with the stage that rejected it and a
    /// human-readable reason the caller can act on.
    Invalid { stage: Stage, reason: String },
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid { .. })
    }

    fn reject(error: GuardError) -> Self {
        let stage = error.stage().unwrap_or(Stage::Preflight);
        Verdict::Invalid {
            stage,
            reason: error.to_string(),
        }
    }
}

/// The four-stage guardrail.
///
/// Stateless between calls: the snapshot is immutable and a connection is
/// borrowed from the pool only for the final engine round trip. Safe to
/// clone and share across concurrent calls.
#[derive(Clone)]
pub struct Guardrail {
    snapshot: Arc<SchemaSnapshot>,
    pool: DbPool,
    timeout: Duration,
}

impl Guardrail {
    pub fn new(snapshot: Arc<SchemaSnapshot>, pool: DbPool, timeout: Duration) -> Self {
        Self {
            snapshot,
            pool,
            timeout,
        }
    }

    /// Run every stage in order, stopping at the first failure.
    pub async fn validate(&self, sql: &str) -> Verdict {
        let parsed = match structural::parse(sql) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::debug!(error = %error, "structural stage rejected query");
                return Verdict::reject(error);
            }
        };

        if let Err(error) = keywords::scan(&parsed.normalized_sql) {
            tracing::debug!(error = %error, "keyword stage rejected query");
            return Verdict::reject(error);
        }

        if let Err(error) = schema::check(&parsed, &self.snapshot) {
            tracing::debug!(error = %error, "schema stage rejected query");
            return Verdict::reject(error);
        }

        if let Err(error) = preflight::run(&self.pool, &parsed.normalized_sql, self.timeout).await {
            tracing::debug!(error = %error, "preflight stage rejected query");
            return Verdict::reject(error);
        }

        Verdict::Valid {
            warnings: advisories(&parsed),
            sql: parsed.normalized_sql,
        }
    }
}

/// Non-fatal advisories carried alongside a valid verdict.
fn advisories(parsed: &ParsedStatement) -> Vec<String> {
    let mut warnings = Vec::new();
    if parsed.join_count > 3 {
        warnings.push("query contains multiple JOINs; may be complex".to_string());
    }
    if parsed.has_wildcard {
        warnings.push("query uses SELECT *; consider specifying columns".to_string());
    }
    warnings
}
