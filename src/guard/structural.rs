//! Structural validation - parse untrusted SQL into exactly one SELECT
//! statement and extract the identifiers it references.
//!
//! Parsing goes through sqlparser's SQLite grammar, so comments are stripped
//! and statement counting cannot be confused by separators hidden inside
//! comments or string literals. Identifier extraction is best-effort
//! syntactic: it walks FROM/JOIN clauses, derived tables, CTE bodies, set
//! operations and the common expression positions, without attempting full
//! name resolution.

use std::collections::{HashMap, HashSet};

use sqlparser::ast::{
    Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments, GroupByExpr, JoinConstraint,
    JoinOperator, ObjectName, Query, Select, SelectItem, SetExpr, Statement, TableFactor,
    TableWithJoins,
};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::types::GuardError;

/// A column reference extracted from the statement. The table hint is the
/// qualifier as written (table name or alias); absent for bare columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

/// Outcome of structural parsing.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    /// The statement re-rendered from the AST: comments stripped, whitespace
    /// canonical. This is the only text later stages and the executor see.
    pub normalized_sql: String,
    /// Schema tables referenced in FROM/JOIN clauses, derived tables and CTE
    /// bodies. CTE names themselves are excluded.
    pub tables: Vec<String>,
    /// Column references, best-effort syntactic.
    pub columns: Vec<ColumnRef>,
    /// Lowercased FROM/JOIN alias to table name.
    pub aliases: HashMap<String, String>,
    pub join_count: usize,
    pub has_wildcard: bool,
}

/// Parse raw SQL text and enforce the structural rules:
/// exactly one statement, and it must be a SELECT (optionally CTE-wrapped).
pub fn parse(sql: &str) -> Result<ParsedStatement, GuardError> {
    let mut statements = Parser::parse_sql(&SQLiteDialect {}, sql)
        .map_err(|e| GuardError::Structural(format!("unable to parse SQL query: {e}")))?;

    match statements.len() {
        0 => return Err(GuardError::Structural("empty query".to_string())),
        1 => {}
        n => {
            return Err(GuardError::Structural(format!(
                "multiple statements: expected exactly one, found {n}"
            )))
        }
    }

    let statement = statements.remove(0);
    let Statement::Query(query) = &statement else {
        return Err(GuardError::Structural(format!(
            "not a read query: only SELECT statements are allowed, found {}",
            leading_keyword(&statement)
        )));
    };
    if !is_select_body(&query.body) {
        return Err(GuardError::Structural(format!(
            "not a read query: only SELECT statements are allowed, found {}",
            leading_keyword(&statement)
        )));
    }

    let mut extractor = Extractor::default();
    extractor.query(query);

    Ok(ParsedStatement {
        normalized_sql: statement.to_string(),
        tables: extractor.tables,
        columns: extractor.columns,
        aliases: extractor.aliases,
        join_count: extractor.join_count,
        has_wildcard: extractor.has_wildcard,
    })
}

/// First keyword of the statement's canonical rendering, for error messages.
fn leading_keyword(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_uppercase()
}

/// A query body counts as a SELECT if every leaf of it is one; bare VALUES
/// lists and table constructors do not.
fn is_select_body(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(_) => true,
        SetExpr::Query(query) => is_select_body(&query.body),
        SetExpr::SetOperation { left, right, .. } => is_select_body(left) && is_select_body(right),
        _ => false,
    }
}

#[derive(Default)]
struct Extractor {
    tables: Vec<String>,
    seen: HashSet<String>,
    ctes: HashSet<String>,
    columns: Vec<ColumnRef>,
    aliases: HashMap<String, String>,
    join_count: usize,
    has_wildcard: bool,
}

impl Extractor {
    fn query(&mut self, query: &Query) {
        if let Some(with) = &query.with {
            // CTE names shadow schema tables for the whole statement.
            for cte in &with.cte_tables {
                self.ctes.insert(cte.alias.name.value.to_lowercase());
            }
            for cte in &with.cte_tables {
                self.query(&cte.query);
            }
        }
        self.set_expr(&query.body);
        if let Some(order_by) = &query.order_by {
            for item in &order_by.exprs {
                self.expr(&item.expr);
            }
        }
    }

    fn set_expr(&mut self, body: &SetExpr) {
        match body {
            SetExpr::Select(select) => self.select(select),
            SetExpr::Query(query) => self.query(query),
            SetExpr::SetOperation { left, right, .. } => {
                self.set_expr(left);
                self.set_expr(right);
            }
            _ => {}
        }
    }

    fn select(&mut self, select: &Select) {
        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) => self.expr(expr),
                SelectItem::ExprWithAlias { expr, .. } => self.expr(expr),
                SelectItem::QualifiedWildcard(..) | SelectItem::Wildcard(..) => {
                    self.has_wildcard = true;
                }
            }
        }
        for table in &select.from {
            self.table_with_joins(table);
        }
        if let Some(selection) = &select.selection {
            self.expr(selection);
        }
        if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
            for expr in exprs {
                self.expr(expr);
            }
        }
        if let Some(having) = &select.having {
            self.expr(having);
        }
    }

    fn table_with_joins(&mut self, table: &TableWithJoins) {
        self.table_factor(&table.relation);
        self.join_count += table.joins.len();
        for join in &table.joins {
            self.table_factor(&join.relation);
            let constraint = match &join.join_operator {
                JoinOperator::Inner(c)
                | JoinOperator::LeftOuter(c)
                | JoinOperator::RightOuter(c)
                | JoinOperator::FullOuter(c) => c,
                _ => continue,
            };
            if let JoinConstraint::On(expr) = constraint {
                self.expr(expr);
            }
        }
    }

    fn table_factor(&mut self, factor: &TableFactor) {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let table = object_name(name);
                let lowered = table.to_lowercase();
                if self.ctes.contains(&lowered) {
                    return;
                }
                if let Some(alias) = alias {
                    self.aliases
                        .insert(alias.name.value.to_lowercase(), table.clone());
                }
                if self.seen.insert(lowered) {
                    self.tables.push(table);
                }
            }
            TableFactor::Derived { subquery, .. } => self.query(subquery),
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.table_with_joins(table_with_joins),
            _ => {}
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Identifier(ident) => {
                self.columns.push(ColumnRef {
                    table: None,
                    column: ident.value.clone(),
                });
            }
            Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
                self.columns.push(ColumnRef {
                    table: Some(parts[parts.len() - 2].value.clone()),
                    column: parts[parts.len() - 1].value.clone(),
                });
            }
            Expr::BinaryOp { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Expr::UnaryOp { expr, .. }
            | Expr::Nested(expr)
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr)
            | Expr::IsTrue(expr)
            | Expr::IsFalse(expr)
            | Expr::IsNotTrue(expr)
            | Expr::IsNotFalse(expr) => self.expr(expr),
            Expr::Cast { expr, .. } => self.expr(expr),
            Expr::Between {
                expr, low, high, ..
            } => {
                self.expr(expr);
                self.expr(low);
                self.expr(high);
            }
            Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
                self.expr(expr);
                self.expr(pattern);
            }
            Expr::InList { expr, list, .. } => {
                self.expr(expr);
                for item in list {
                    self.expr(item);
                }
            }
            Expr::InSubquery { expr, subquery, .. } => {
                self.expr(expr);
                self.query(subquery);
            }
            Expr::Exists { subquery, .. } => self.query(subquery),
            Expr::Subquery(query) => self.query(query),
            Expr::Tuple(items) => {
                for item in items {
                    self.expr(item);
                }
            }
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                if let Some(operand) = operand {
                    self.expr(operand);
                }
                for condition in conditions {
                    self.expr(condition);
                }
                for result in results {
                    self.expr(result);
                }
                if let Some(else_result) = else_result {
                    self.expr(else_result);
                }
            }
            Expr::Function(function) => self.function(function),
            _ => {}
        }
    }

    fn function(&mut self, function: &Function) {
        match &function.args {
            FunctionArguments::List(list) => {
                for arg in &list.args {
                    let arg = match arg {
                        FunctionArg::Named { arg, .. } => arg,
                        FunctionArg::Unnamed(arg) => arg,
                    };
                    if let FunctionArgExpr::Expr(expr) = arg {
                        self.expr(expr);
                    }
                }
            }
            FunctionArguments::Subquery(query) => self.query(query),
            FunctionArguments::None => {}
        }
    }
}

fn object_name(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_default()
}
