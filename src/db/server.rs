//! Client/server engines (PostgreSQL, MySQL) over `sqlx` pools.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::error::ErrorKind;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row as _, TypeInfo};

use super::placeholders;
use super::returning::{self, RawExecutor};
use super::storage::{
    Backend, QueryResult, Row, SqlValue, Statement, Storage, StorageError, StorageErrorKind,
};

#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub statement_timeout: Option<Duration>,
}

// ── PostgreSQL ──

/// Native RETURNING support; statements pass straight through.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str, settings: PoolSettings) -> anyhow::Result<Self> {
        let timeout_ms = settings.statement_timeout.map(|d| d.as_millis());
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    if let Some(ms) = timeout_ms {
                        let sql = format!("SET statement_timeout = {ms}");
                        sqlx::query(&sql).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(url)
            .await
            .context("failed to connect to PostgreSQL")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Storage for PostgresStore {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn execute(&self, stmt: &Statement) -> Result<QueryResult, StorageError> {
        let rewritten = placeholders::rewrite(Backend::Postgres, &stmt.sql, &stmt.params)?;
        let mut query = sqlx::query(&rewritten.sql);
        for param in &rewritten.params {
            query = match param {
                // An untyped integer NULL still assigns into text columns.
                SqlValue::Null => query.bind(None::<i64>),
                SqlValue::Integer(i) => query.bind(*i),
                SqlValue::Real(f) => query.bind(*f),
                SqlValue::Text(s) => query.bind(s.clone()),
                SqlValue::Bool(b) => query.bind(i64::from(*b)),
            };
        }

        if returns_rows(&stmt.sql) {
            let rows = query
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_error(Backend::Postgres, e))?;
            let is_write = !is_read(&stmt.sql);
            let rows = rows.iter().map(pg_row_to_json).collect::<Result<Vec<_>, _>>()?;
            let changes = is_write.then_some(rows.len() as u64);
            Ok(QueryResult {
                rows,
                changes,
                last_insert_id: None,
            })
        } else {
            let done = query
                .execute(&self.pool)
                .await
                .map_err(|e| map_error(Backend::Postgres, e))?;
            Ok(QueryResult {
                rows: Vec::new(),
                changes: Some(done.rows_affected()),
                last_insert_id: None,
            })
        }
    }
}

fn pg_row_to_json(row: &PgRow) -> Result<Row, StorageError> {
    let decode = |e: sqlx::Error| map_error(Backend::Postgres, e);
    let mut record = Row::new();

    for (i, column) in row.columns().iter().enumerate() {
        let value = match column.type_info().name() {
            "INT2" => row.try_get::<Option<i16>, _>(i).map_err(decode)?.map(Value::from),
            "INT4" => row.try_get::<Option<i32>, _>(i).map_err(decode)?.map(Value::from),
            "INT8" => row.try_get::<Option<i64>, _>(i).map_err(decode)?.map(Value::from),
            "FLOAT4" => row.try_get::<Option<f32>, _>(i).map_err(decode)?.map(|f| Value::from(f64::from(f))),
            "FLOAT8" => row.try_get::<Option<f64>, _>(i).map_err(decode)?.map(Value::from),
            "BOOL" => row
                .try_get::<Option<bool>, _>(i)
                .map_err(decode)?
                .map(|b| Value::from(i64::from(b))),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(i)
                .map_err(decode)?
                .map(format_timestamp),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(i)
                .map_err(decode)?
                .map(|t| format_timestamp(t.naive_utc())),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(i)
                .map_err(decode)?
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
            "TIME" => row
                .try_get::<Option<NaiveTime>, _>(i)
                .map_err(decode)?
                .map(|t| Value::String(t.format("%H:%M").to_string())),
            _ => row.try_get::<Option<String>, _>(i).map_err(decode)?.map(Value::String),
        };
        record.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }

    Ok(record)
}

// ── MySQL ──

/// No RETURNING support; emulated through follow-up reads keyed by `id`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(url: &str, settings: PoolSettings) -> anyhow::Result<Self> {
        let url = url
            .strip_prefix("mariadb://")
            .map(|rest| format!("mysql://{rest}"))
            .unwrap_or_else(|| url.to_string());
        let timeout_ms = settings.statement_timeout.map(|d| d.as_millis());
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    if let Some(ms) = timeout_ms {
                        let sql = format!("SET SESSION max_execution_time = {ms}");
                        sqlx::query(&sql).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .context("failed to connect to MySQL")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl RawExecutor for MySqlStore {
    fn backend(&self) -> Backend {
        Backend::MySql
    }

    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, StorageError> {
        let rewritten = placeholders::rewrite(Backend::MySql, sql, params)?;
        let mut query = sqlx::query(&rewritten.sql);
        for param in &rewritten.params {
            query = match param {
                SqlValue::Null => query.bind(None::<String>),
                SqlValue::Integer(i) => query.bind(*i),
                SqlValue::Real(f) => query.bind(*f),
                SqlValue::Text(s) => query.bind(s.clone()),
                SqlValue::Bool(b) => query.bind(i64::from(*b)),
            };
        }

        if is_read(sql) {
            let rows = query
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_error(Backend::MySql, e))?;
            let rows = rows.iter().map(mysql_row_to_json).collect::<Result<Vec<_>, _>>()?;
            Ok(QueryResult {
                rows,
                changes: None,
                last_insert_id: None,
            })
        } else {
            let done = query
                .execute(&self.pool)
                .await
                .map_err(|e| map_error(Backend::MySql, e))?;
            let last_insert_id = returning::is_insert(sql)
                .then(|| i64::try_from(done.last_insert_id()).ok())
                .flatten();
            Ok(QueryResult {
                rows: Vec::new(),
                changes: Some(done.rows_affected()),
                last_insert_id,
            })
        }
    }
}

#[async_trait]
impl Storage for MySqlStore {
    fn backend(&self) -> Backend {
        Backend::MySql
    }

    async fn execute(&self, stmt: &Statement) -> Result<QueryResult, StorageError> {
        returning::execute_emulated(self, stmt).await
    }
}

fn mysql_row_to_json(row: &MySqlRow) -> Result<Row, StorageError> {
    let decode = |e: sqlx::Error| map_error(Backend::MySql, e);
    let mut record = Row::new();

    for (i, column) in row.columns().iter().enumerate() {
        let value = match column.type_info().name() {
            "BOOLEAN" => row
                .try_get::<Option<bool>, _>(i)
                .map_err(decode)?
                .map(|b| Value::from(i64::from(b))),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                row.try_get::<Option<i64>, _>(i).map_err(decode)?.map(Value::from)
            }
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
            | "BIGINT UNSIGNED" => row.try_get::<Option<u64>, _>(i).map_err(decode)?.map(Value::from),
            "FLOAT" => row.try_get::<Option<f32>, _>(i).map_err(decode)?.map(|f| Value::from(f64::from(f))),
            "DOUBLE" => row.try_get::<Option<f64>, _>(i).map_err(decode)?.map(Value::from),
            "DATETIME" | "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(i)
                .map_err(decode)?
                .map(format_timestamp),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(i)
                .map_err(decode)?
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
            "TIME" => row
                .try_get::<Option<NaiveTime>, _>(i)
                .map_err(decode)?
                .map(|t| Value::String(t.format("%H:%M").to_string())),
            _ => row.try_get::<Option<String>, _>(i).map_err(decode)?.map(Value::String),
        };
        record.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }

    Ok(record)
}

// ── Shared ──

fn format_timestamp(t: NaiveDateTime) -> Value {
    Value::String(t.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn is_read(sql: &str) -> bool {
    let head = sql.trim_start();
    ["SELECT", "WITH", "SHOW", "VALUES"].iter().any(|kw| {
        head.get(..kw.len())
            .map(|h| h.eq_ignore_ascii_case(kw))
            .unwrap_or(false)
    })
}

fn returns_rows(sql: &str) -> bool {
    is_read(sql) || returning::find_keyword(sql, "RETURNING").is_some()
}

fn map_error(backend: Backend, e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) => {
            let kind = match db.kind() {
                ErrorKind::UniqueViolation => StorageErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => StorageErrorKind::ForeignKeyViolation,
                ErrorKind::CheckViolation => StorageErrorKind::CheckViolation,
                _ => StorageErrorKind::Other,
            };
            StorageError {
                backend,
                kind,
                code: db.code().map(|c| c.into_owned()),
                message: db.message().to_string(),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => StorageError {
            backend,
            kind: StorageErrorKind::Decode,
            code: None,
            message: e.to_string(),
        },
        _ => StorageError::other(backend, e.to_string()),
    }
}
