use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{ffi, Connection};
use serde_json::Value;

use super::placeholders;
use super::returning::{self, RawExecutor};
use super::storage::{
    Backend, QueryResult, Row, SqlValue, Statement, Storage, StorageError, StorageErrorKind,
};

/// Embedded engine: one shared connection behind a mutex.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &str, busy_timeout: Option<Duration>) -> anyhow::Result<Self> {
        let path = path.strip_prefix("sqlite://").or_else(|| path.strip_prefix("sqlite:")).unwrap_or(path);

        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create database directory for {path}"))?;
                }
            }
        }

        let conn = Connection::open(path).context("failed to open database")?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("failed to set database pragmas")?;
        conn.busy_timeout(busy_timeout.unwrap_or(Duration::from_secs(5)))
            .context("failed to set busy timeout")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Self::open(":memory:", None)
    }
}

#[async_trait]
impl RawExecutor for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, StorageError> {
        let rewritten = placeholders::rewrite(Backend::Sqlite, sql, params)?;
        let values: Vec<SqliteValue> = rewritten.params.iter().map(to_sqlite).collect();

        let conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::other(Backend::Sqlite, "connection mutex poisoned"))?;
        let mut stmt = conn.prepare(&rewritten.sql).map_err(map_error)?;

        if stmt.column_count() > 0 {
            let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let mut rows = stmt
                .query(rusqlite::params_from_iter(values.iter()))
                .map_err(map_error)?;

            let mut out = Vec::new();
            while let Some(row) = rows.next().map_err(map_error)? {
                let mut record = Row::new();
                for (i, name) in names.iter().enumerate() {
                    let value = row.get_ref(i).map_err(map_error)?;
                    record.insert(name.clone(), to_json(value));
                }
                out.push(record);
            }

            Ok(QueryResult {
                rows: out,
                changes: None,
                last_insert_id: None,
            })
        } else {
            let changes = stmt
                .execute(rusqlite::params_from_iter(values.iter()))
                .map_err(map_error)?;
            let last_insert_id = returning::is_insert(sql).then(|| conn.last_insert_rowid());

            Ok(QueryResult {
                rows: Vec::new(),
                changes: Some(changes as u64),
                last_insert_id,
            })
        }
    }
}

#[async_trait]
impl Storage for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn execute(&self, stmt: &Statement) -> Result<QueryResult, StorageError> {
        returning::execute_emulated(self, stmt).await
    }
}

fn to_sqlite(value: &SqlValue) -> SqliteValue {
    match value {
        SqlValue::Null => SqliteValue::Null,
        SqlValue::Integer(i) => SqliteValue::Integer(*i),
        SqlValue::Real(f) => SqliteValue::Real(*f),
        SqlValue::Text(s) => SqliteValue::Text(s.clone()),
        SqlValue::Bool(b) => SqliteValue::Integer(i64::from(*b)),
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}

fn map_error(e: rusqlite::Error) -> StorageError {
    match &e {
        rusqlite::Error::SqliteFailure(err, msg) => {
            let (kind, code) = match err.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    (StorageErrorKind::UniqueViolation, "SQLITE_CONSTRAINT_UNIQUE".to_string())
                }
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY => (
                    StorageErrorKind::UniqueViolation,
                    "SQLITE_CONSTRAINT_PRIMARYKEY".to_string(),
                ),
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => (
                    StorageErrorKind::ForeignKeyViolation,
                    "SQLITE_CONSTRAINT_FOREIGNKEY".to_string(),
                ),
                ffi::SQLITE_CONSTRAINT_CHECK => {
                    (StorageErrorKind::CheckViolation, "SQLITE_CONSTRAINT_CHECK".to_string())
                }
                other => (StorageErrorKind::Other, other.to_string()),
            };
            StorageError {
                backend: Backend::Sqlite,
                kind,
                code: Some(code),
                message: msg.clone().unwrap_or_else(|| e.to_string()),
            }
        }
        _ => StorageError::other(Backend::Sqlite, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute_batch(
                "CREATE TABLE items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    qty INTEGER NOT NULL DEFAULT 0,
                    is_active INTEGER NOT NULL DEFAULT 1
                );",
            )
            .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_insert_returning_is_emulated() {
        let store = store();
        let result = store
            .execute(
                &Statement::new("INSERT INTO items (name, qty) VALUES ($1, $2) RETURNING *")
                    .bind("towel")
                    .bind(3),
            )
            .await
            .unwrap();

        assert_eq!(result.changes, Some(1));
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["name"], "towel");
        assert_eq!(result.rows[0]["qty"], 3);
        assert_eq!(result.rows[0]["id"].as_i64(), result.last_insert_id);
    }

    #[tokio::test]
    async fn test_update_returning_reads_rows_after_write() {
        let store = store();
        for name in ["a", "b"] {
            store
                .execute(&Statement::new("INSERT INTO items (name) VALUES ($1)").bind(name))
                .await
                .unwrap();
        }

        let result = store
            .execute(
                &Statement::new("UPDATE items SET qty = $1 WHERE name = $2 RETURNING id, qty")
                    .bind(9)
                    .bind("b"),
            )
            .await
            .unwrap();

        assert_eq!(result.changes, Some(1));
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["qty"], 9);
    }

    #[tokio::test]
    async fn test_update_with_no_match_returns_no_rows() {
        let store = store();
        let result = store
            .execute(&Statement::new("UPDATE items SET qty = 1 WHERE id = $1 RETURNING *").bind(42))
            .await
            .unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.changes, Some(0));
    }

    #[tokio::test]
    async fn test_delete_returning_reads_rows_before_write() {
        let store = store();
        store
            .execute(&Statement::new("INSERT INTO items (name) VALUES ($1)").bind("gone"))
            .await
            .unwrap();

        let result = store
            .execute(&Statement::new("DELETE FROM items WHERE name = $1 RETURNING *").bind("gone"))
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["name"], "gone");

        let left = store.execute(&Statement::new("SELECT COUNT(*) AS total FROM items")).await.unwrap();
        assert_eq!(left.scalar_i64("total"), Some(0));
    }

    #[tokio::test]
    async fn test_unique_violation_carries_native_code() {
        let store = store();
        let insert = Statement::new("INSERT INTO items (name) VALUES ($1)").bind("dup");
        store.execute(&insert).await.unwrap();
        let err = store.execute(&insert).await.unwrap_err();

        assert!(err.is_unique_violation());
        assert_eq!(err.code.as_deref(), Some("SQLITE_CONSTRAINT_UNIQUE"));
    }

    #[tokio::test]
    async fn test_booleans_round_trip_as_integers() {
        let store = store();
        let result = store
            .execute(
                &Statement::new("INSERT INTO items (name, is_active) VALUES ($1, $2) RETURNING is_active")
                    .bind("flag")
                    .bind(false),
            )
            .await
            .unwrap();
        assert_eq!(result.rows[0]["is_active"], 0);
    }

    #[tokio::test]
    async fn test_ping() {
        assert!(store().ping().await.is_ok());
    }
}
