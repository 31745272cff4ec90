//! Keyword denylist - second line of defense against write/DDL intent
//!
//! Runs independently of the structural stage; neither subsumes the other.
//! The scan operates on sqlparser tokens rather than substrings, so a column
//! named `update_count` passes while a case-mixed `DrOp` does not, and
//! comments or string literals never trigger a violation.

use sqlparser::dialect::SQLiteDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::types::GuardError;

/// Tokens that must never appear anywhere in a query, regardless of
/// position: DDL, write DML, transaction control and engine control.
const DENYLIST: &[&str] = &[
    "CREATE",
    "DROP",
    "ALTER",
    "TRUNCATE",
    "INSERT",
    "UPDATE",
    "DELETE",
    "REPLACE",
    "MERGE",
    "BEGIN",
    "COMMIT",
    "ROLLBACK",
    "PRAGMA",
    "ATTACH",
    "DETACH",
    "VACUUM",
    "LOAD_EXTENSION",
];

/// Scan tokenized SQL for forbidden keywords and stacked statements.
pub fn scan(sql: &str) -> Result<(), GuardError> {
    let tokens = Tokenizer::new(&SQLiteDialect {}, sql)
        .tokenize()
        .map_err(|e| GuardError::Tokenize(e.to_string()))?;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            // Quoted words are identifiers, never keywords.
            Token::Word(word) if word.quote_style.is_none() => {
                let upper = word.value.to_uppercase();
                if DENYLIST.contains(&upper.as_str()) {
                    return Err(GuardError::Keyword(upper));
                }
            }
            // A separator followed by anything further is a stacked query.
            Token::SemiColon => {
                let stacked = tokens[i + 1..]
                    .iter()
                    .any(|t| !matches!(t, Token::Whitespace(_) | Token::SemiColon | Token::EOF));
                if stacked {
                    return Err(GuardError::Keyword(";".to_string()));
                }
            }
            _ => {}
        }
    }

    Ok(())
}
