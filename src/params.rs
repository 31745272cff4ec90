//! Tool parameter types

use schemars::JsonSchema;
use serde::Deserialize;

/// Parameters for the validate_query tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidateParams {
    /// SQL text to validate. Only a single SELECT statement can pass.
    pub sql: String,
}

/// Parameters for the execute_sql tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteParams {
    /// SQL text to execute. The full guardrail pipeline runs first; the
    /// normalized text is what actually executes.
    pub sql: String,
}
