//! Shared fixtures for unit tests

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tempfile::TempDir;

use crate::catalog::{ColumnInfo, SchemaSnapshot, TableSchema};
use crate::db::{self, DbPool};

/// A small Northwind-style database on disk. Keep the `TempDir` alive for
/// as long as the database is in use.
pub fn northwind_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("northwind.db");
    let conn = Connection::open(&path).expect("create database");
    conn.execute_batch(
        "CREATE TABLE Customers (
             CustomerID TEXT PRIMARY KEY,
             CompanyName TEXT NOT NULL,
             Country TEXT
         );
         CREATE TABLE Orders (
             OrderID INTEGER PRIMARY KEY,
             CustomerID TEXT NOT NULL,
             ShipCountry TEXT
         );
         INSERT INTO Customers VALUES ('ALFKI', 'Alfreds Futterkiste', 'Germany');
         INSERT INTO Customers VALUES ('BONAP', 'Bon app', 'France');
         INSERT INTO Orders VALUES (10248, 'ALFKI', 'Germany');
         INSERT INTO Orders VALUES (10249, 'BONAP', 'France');
         INSERT INTO Orders VALUES (10250, 'BONAP', 'France');",
    )
    .expect("seed database");
    (dir, path)
}

pub fn pool(path: &Path) -> DbPool {
    DbPool::open(path, 2, Duration::from_secs(5)).expect("open pool")
}

pub fn snapshot(path: &Path) -> SchemaSnapshot {
    let conn = db::open_read_only(path, Duration::from_secs(5)).expect("open read-only");
    SchemaSnapshot::load(&conn).expect("load snapshot")
}

/// Build an in-memory snapshot without a database behind it.
pub fn synthetic(tables: &[(&str, &[&str])]) -> SchemaSnapshot {
    let tables = tables
        .iter()
        .map(|(name, columns)| TableSchema {
            name: (*name).to_string(),
            columns: columns
                .iter()
                .map(|column| ColumnInfo {
                    name: (*column).to_string(),
                    data_type: "TEXT".to_string(),
                    notnull: false,
                    default_value: None,
                    pk: false,
                })
                .collect(),
        })
        .collect();
    SchemaSnapshot::new(tables)
}
