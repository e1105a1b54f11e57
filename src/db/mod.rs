pub mod builder;
pub mod placeholders;
pub mod queries;
pub mod returning;
pub mod schema;
pub mod seed;
pub mod server;
pub mod sqlite;
pub mod storage;

use std::sync::Arc;

use anyhow::Context;

use crate::config::AppConfig;
use server::{MySqlStore, PoolSettings, PostgresStore};
use sqlite::SqliteStore;
pub use storage::{Backend, QueryResult, Row, SqlValue, Statement, Storage, StorageError};

/// Opens the engine named by `DATABASE_URL`. The backend is fixed here for the
/// life of the process.
pub async fn connect(config: &AppConfig) -> anyhow::Result<Arc<dyn Storage>> {
    let url = config.database_url.as_str();
    let settings = PoolSettings {
        max_connections: config.db_max_connections,
        statement_timeout: config.db_statement_timeout,
    };

    let store: Arc<dyn Storage> = match Backend::from_url(url) {
        Backend::Sqlite => Arc::new(SqliteStore::open(url, settings.statement_timeout)?),
        Backend::Postgres => Arc::new(PostgresStore::connect(url, settings).await?),
        Backend::MySql => Arc::new(MySqlStore::connect(url, settings).await?),
    };

    tracing::info!(backend = %store.backend(), "connected to database");
    Ok(store)
}

/// Schema creation followed by seeding; both are idempotent.
pub async fn init(db: &dyn Storage, config: &AppConfig) -> anyhow::Result<()> {
    schema::create(db).await.context("failed to create schema")?;
    seed::run(db, config).await.context("failed to seed database")?;
    Ok(())
}
