use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A result row keyed by column name. Flags come back as 0/1 integers on every backend.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
    MySql,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
            Backend::MySql => "mysql",
        }
    }

    /// Picks the engine from the connection string scheme. Anything without a
    /// recognised server scheme is treated as an embedded database path.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Backend::Postgres
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Backend::MySql
        } else {
            Backend::Sqlite
        }
    }

    pub fn supports_returning(&self) -> bool {
        matches!(self, Backend::Postgres)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Parameters ──

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl SqlValue {
    /// Booleans are stored as 0/1 integers everywhere.
    pub fn normalized(&self) -> SqlValue {
        match self {
            SqlValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
            other => other.clone(),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Statement text in the canonical `$1, $2, …` placeholder syntax plus its parameters.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }
}

// ── Results ──

#[derive(Debug, Default, Clone)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub changes: Option<u64>,
    pub last_insert_id: Option<i64>,
}

impl QueryResult {
    pub fn decode_all<T: DeserializeOwned>(self, backend: Backend) -> Result<Vec<T>, StorageError> {
        self.rows
            .into_iter()
            .map(|row| decode_row(backend, row))
            .collect()
    }

    pub fn decode_first<T: DeserializeOwned>(
        self,
        backend: Backend,
    ) -> Result<Option<T>, StorageError> {
        match self.rows.into_iter().next() {
            Some(row) => decode_row(backend, row).map(Some),
            None => Ok(None),
        }
    }

    /// Reads an integer column from the first row, e.g. `COUNT(*) AS total`.
    pub fn scalar_i64(&self, column: &str) -> Option<i64> {
        let value = self.rows.first()?.get(column)?;
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

fn decode_row<T: DeserializeOwned>(backend: Backend, row: Row) -> Result<T, StorageError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StorageError {
        backend,
        kind: StorageErrorKind::Decode,
        code: None,
        message: format!("failed to decode row: {e}"),
    })
}

// ── Errors ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    CheckViolation,
    Decode,
    Other,
}

#[derive(Debug, thiserror::Error)]
#[error("{backend} error: {message}")]
pub struct StorageError {
    pub backend: Backend,
    pub kind: StorageErrorKind,
    /// Native engine code, e.g. `SQLITE_CONSTRAINT_UNIQUE`, `23505` or `1062`.
    pub code: Option<String>,
    pub message: String,
}

impl StorageError {
    pub fn other(backend: Backend, message: impl Into<String>) -> Self {
        Self {
            backend,
            kind: StorageErrorKind::Other,
            code: None,
            message: message.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.kind == StorageErrorKind::UniqueViolation
    }
}

// ── Port ──

#[async_trait]
pub trait Storage: Send + Sync {
    fn backend(&self) -> Backend;

    async fn execute(&self, stmt: &Statement) -> Result<QueryResult, StorageError>;

    async fn ping(&self) -> Result<(), StorageError> {
        self.execute(&Statement::new("SELECT 1 AS ok")).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_url() {
        assert_eq!(Backend::from_url("postgres://u@h/db"), Backend::Postgres);
        assert_eq!(Backend::from_url("postgresql://u@h/db"), Backend::Postgres);
        assert_eq!(Backend::from_url("mysql://u@h/db"), Backend::MySql);
        assert_eq!(Backend::from_url("mariadb://u@h/db"), Backend::MySql);
        assert_eq!(Backend::from_url("sqlite:data/app.db"), Backend::Sqlite);
        assert_eq!(Backend::from_url(":memory:"), Backend::Sqlite);
    }

    #[test]
    fn test_bool_normalizes_to_integer() {
        assert_eq!(SqlValue::from(true).normalized(), SqlValue::Integer(1));
        assert_eq!(SqlValue::from(false).normalized(), SqlValue::Integer(0));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
    }

    #[test]
    fn test_scalar_reads_count_column() {
        let mut row = Row::new();
        row.insert("total".into(), Value::from(7));
        let result = QueryResult {
            rows: vec![row],
            ..Default::default()
        };
        assert_eq!(result.scalar_i64("total"), Some(7));
        assert_eq!(result.scalar_i64("missing"), None);
    }
}
