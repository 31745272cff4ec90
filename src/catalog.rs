//! Schema catalog - immutable snapshot of the database's tables and columns
//!
//! Loaded once at startup from `sqlite_master` and `PRAGMA table_info`.
//! Identifier comparison is case-insensitive throughout, matching SQL
//! identifier semantics.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;
use serde::Serialize;

use crate::types::GuardError;

/// Column metadata as reported by `PRAGMA table_info`
#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub notnull: bool,
    pub default_value: Option<String>,
    pub pk: bool,
}

/// One table with its ordered column list
#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Immutable-once-built table/column inventory with O(1) membership lookups.
///
/// Built from a live connection by [`SchemaSnapshot::load`], or from
/// synthetic tables via [`SchemaSnapshot::new`] (the pipeline takes the
/// snapshot by `Arc`, so tests can inject whatever schema they need).
#[derive(Debug)]
pub struct SchemaSnapshot {
    tables: Vec<TableSchema>,
    index: HashMap<String, usize>,
    columns: HashMap<String, HashSet<String>>,
}

impl SchemaSnapshot {
    pub fn new(tables: Vec<TableSchema>) -> Self {
        let mut index = HashMap::with_capacity(tables.len());
        let mut columns = HashMap::with_capacity(tables.len());
        for (i, table) in tables.iter().enumerate() {
            let key = table.name.to_lowercase();
            let cols: HashSet<String> = table
                .columns
                .iter()
                .map(|c| c.name.to_lowercase())
                .collect();
            columns.insert(key.clone(), cols);
            index.insert(key, i);
        }
        Self {
            tables,
            index,
            columns,
        }
    }

    /// Read every user table and its columns from the database.
    ///
    /// Any failure is `CatalogUnavailable`: the service must not start with
    /// a partial catalog.
    pub fn load(conn: &Connection) -> Result<Self, GuardError> {
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(unavailable)?;

        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(unavailable)?
            .collect::<Result<_, _>>()
            .map_err(unavailable)?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let mut info = conn
                .prepare(&format!(
                    "PRAGMA table_info('{}')",
                    name.replace('\'', "''")
                ))
                .map_err(unavailable)?;

            let columns: Vec<ColumnInfo> = info
                .query_map([], |row| {
                    Ok(ColumnInfo {
                        name: row.get(1)?,
                        data_type: row.get(2)?,
                        notnull: row.get::<_, i64>(3)? != 0,
                        default_value: row.get(4)?,
                        pk: row.get::<_, i64>(5)? != 0,
                    })
                })
                .map_err(unavailable)?
                .collect::<Result<_, _>>()
                .map_err(unavailable)?;

            tables.push(TableSchema { name, columns });
        }

        Ok(Self::new(tables))
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    pub fn column_exists(&self, table: &str, column: &str) -> bool {
        self.columns
            .get(&table.to_lowercase())
            .is_some_and(|cols| cols.contains(&column.to_lowercase()))
    }

    /// All tables, in catalog order.
    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    /// Ordered columns of one table, if it exists.
    pub fn columns_of(&self, table: &str) -> Option<&[ColumnInfo]> {
        self.index
            .get(&table.to_lowercase())
            .map(|&i| self.tables[i].columns.as_slice())
    }
}

fn unavailable(error: rusqlite::Error) -> GuardError {
    GuardError::CatalogUnavailable(error.to_string())
}
